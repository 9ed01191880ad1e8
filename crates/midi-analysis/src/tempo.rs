//! Tempo normalization.
//!
//! Every file in a corpus is re-timed to one fixed tempo before rendering,
//! so a fixed number of roll samples always spans the same number of beats.
//! Declared tempo changes are discarded; only the tick grid survives.

use crate::analyze::MidiFileContext;
use crate::note::{PerformedNote, Performance, TimedNote};

/// Place notes on a seconds timeline as if the whole file ran at `target_bpm`.
///
/// Percussion-channel notes are dropped: they carry no pitch information.
pub fn normalize_tempo(notes: &[TimedNote], context: &MidiFileContext, target_bpm: f64) -> Performance {
    let seconds_per_tick = 60.0 / (target_bpm * context.ppq.max(1) as f64);

    let performed = notes
        .iter()
        .filter(|n| !n.is_percussion())
        .map(|n| PerformedNote {
            onset: n.onset_tick as f64 * seconds_per_tick,
            offset: n.offset_tick as f64 * seconds_per_tick,
            pitch: n.pitch,
            velocity: n.velocity,
        })
        .collect();

    Performance::new(performed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::TempoChange;

    fn context(ppq: u16) -> MidiFileContext {
        MidiFileContext {
            ppq,
            // A slow declared tempo that normalization must ignore
            tempo_changes: vec![TempoChange {
                tick: 0,
                microseconds_per_beat: 1_000_000,
                bpm: 60.0,
            }],
            time_signatures: vec![],
            key_signatures: vec![],
        }
    }

    fn note(pitch: u8, onset: u64, offset: u64, channel: u8) -> TimedNote {
        TimedNote {
            onset_tick: onset,
            offset_tick: offset,
            pitch,
            velocity: 100,
            channel,
            track_index: 0,
        }
    }

    #[test]
    fn quarter_note_is_half_second_at_120() {
        let perf = normalize_tempo(&[note(60, 480, 960, 0)], &context(480), 120.0);
        assert_eq!(perf.notes.len(), 1);
        assert!((perf.notes[0].onset - 0.5).abs() < 1e-9);
        assert!((perf.notes[0].offset - 1.0).abs() < 1e-9);
        assert!((perf.end_seconds - 1.0).abs() < 1e-9);
    }

    #[test]
    fn resolution_does_not_change_timing() {
        let coarse = normalize_tempo(&[note(60, 96, 192, 0)], &context(96), 100.0);
        let fine = normalize_tempo(&[note(60, 960, 1920, 0)], &context(960), 100.0);
        assert!((coarse.notes[0].onset - fine.notes[0].onset).abs() < 1e-9);
        assert!((coarse.notes[0].offset - fine.notes[0].offset).abs() < 1e-9);
    }

    #[test]
    fn percussion_is_dropped() {
        let perf = normalize_tempo(
            &[note(60, 0, 480, 0), note(38, 0, 120, 9)],
            &context(480),
            120.0,
        );
        assert_eq!(perf.notes.len(), 1);
        assert_eq!(perf.notes[0].pitch, 60);
    }
}
