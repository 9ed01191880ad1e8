use crate::note::TimedNote;
use midly::{MetaMessage, MidiMessage, Smf, TrackEventKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Ticks per quarter note assumed for SMPTE-timed files.
const FALLBACK_PPQ: u16 = 480;

/// Parsed MIDI file context: resolution, tempo map, meter and key signatures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MidiFileContext {
    pub ppq: u16,
    pub tempo_changes: Vec<TempoChange>,
    pub time_signatures: Vec<TimeSignature>,
    /// Declared key signatures in tick order.
    pub key_signatures: Vec<KeySignature>,
}

impl MidiFileContext {
    /// The first declared key signature, if any.
    pub fn first_key_signature(&self) -> Option<&KeySignature> {
        self.key_signatures.first()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TempoChange {
    pub tick: u64,
    pub microseconds_per_beat: u32,
    pub bpm: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSignature {
    pub tick: u64,
    pub numerator: u8,
    pub denominator: u8,
}

/// A key-signature meta event: sharps (negative = flats) and mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySignature {
    pub tick: u64,
    pub sharps: i8,
    pub minor: bool,
}

impl KeySignature {
    /// Pitch class of the tonic (C=0).
    pub fn tonic_pitch_class(&self) -> u8 {
        let fifths = self.sharps as i32 * 7;
        let offset = if self.minor { 9 } else { 0 };
        (fifths + offset).rem_euclid(12) as u8
    }

    /// Key number in 0..24: majors 0–11, minors 12–23, tonic in the low part.
    pub fn key_number(&self) -> u8 {
        self.tonic_pitch_class() + if self.minor { 12 } else { 0 }
    }
}

/// Parse MIDI bytes and extract notes plus file context.
pub fn decode(midi_bytes: &[u8]) -> crate::Result<(Vec<TimedNote>, MidiFileContext)> {
    let smf = Smf::parse(midi_bytes).map_err(|e| crate::Error::MidiParse(e.to_string()))?;
    Ok(extract_notes(&smf))
}

/// Extract all notes from a parsed file, pairing note-on/note-off events.
pub fn extract_notes(smf: &Smf) -> (Vec<TimedNote>, MidiFileContext) {
    let ppq = match smf.header.timing {
        midly::Timing::Metrical(ticks) => ticks.as_int(),
        midly::Timing::Timecode(_, _) => FALLBACK_PPQ,
    };

    let mut all_notes = Vec::new();
    let mut tempo_changes = Vec::new();
    let mut time_signatures = Vec::new();
    let mut key_signatures = Vec::new();

    for (track_index, track) in smf.tracks.iter().enumerate() {
        let mut current_tick: u64 = 0;
        // Map (channel, pitch) → Vec<(onset_tick, velocity)> for stacking
        let mut pending: HashMap<(u8, u8), Vec<(u64, u8)>> = HashMap::new();

        for event in track {
            current_tick += event.delta.as_int() as u64;

            match event.kind {
                TrackEventKind::Meta(MetaMessage::Tempo(tempo)) => {
                    let usec = tempo.as_int();
                    tempo_changes.push(TempoChange {
                        tick: current_tick,
                        microseconds_per_beat: usec,
                        bpm: 60_000_000.0 / usec.max(1) as f64,
                    });
                }
                TrackEventKind::Meta(MetaMessage::TimeSignature(num, denom_pow, _, _)) => {
                    time_signatures.push(TimeSignature {
                        tick: current_tick,
                        numerator: num,
                        denominator: 1u8.checked_shl(denom_pow as u32).unwrap_or(4),
                    });
                }
                TrackEventKind::Meta(MetaMessage::KeySignature(sharps, minor)) => {
                    key_signatures.push(KeySignature {
                        tick: current_tick,
                        sharps,
                        minor,
                    });
                }
                TrackEventKind::Midi { channel, message } => {
                    let ch = channel.as_int();
                    match message {
                        MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                            pending
                                .entry((ch, key.as_int()))
                                .or_default()
                                .push((current_tick, vel.as_int()));
                        }
                        MidiMessage::NoteOff { key, .. } | MidiMessage::NoteOn { key, .. } => {
                            // vel=0 NoteOn is NoteOff
                            let key = (ch, key.as_int());
                            if let Some(stack) = pending.get_mut(&key) {
                                if let Some((onset, velocity)) = stack.pop() {
                                    all_notes.push(TimedNote {
                                        onset_tick: onset,
                                        offset_tick: current_tick,
                                        pitch: key.1,
                                        velocity,
                                        channel: ch,
                                        track_index,
                                    });
                                }
                            }
                        }
                        _ => {}
                    }
                }
                _ => {}
            }
        }

        // Close any unclosed notes at the track's final tick
        for (&(channel, pitch), stack) in &pending {
            for &(onset, velocity) in stack {
                all_notes.push(TimedNote {
                    onset_tick: onset,
                    offset_tick: current_tick,
                    pitch,
                    velocity,
                    channel,
                    track_index,
                });
            }
        }
    }

    // Sort by onset, then pitch for determinism
    all_notes.sort_by(|a, b| {
        a.onset_tick
            .cmp(&b.onset_tick)
            .then(a.pitch.cmp(&b.pitch))
            .then(a.track_index.cmp(&b.track_index))
    });

    // Deduplicate tempo changes (multiple tracks may repeat them in format 1)
    tempo_changes.sort_by_key(|t| t.tick);
    tempo_changes.dedup_by(|a, b| a.tick == b.tick && a.microseconds_per_beat == b.microseconds_per_beat);

    time_signatures.sort_by_key(|t| t.tick);
    time_signatures.dedup_by(|a, b| a.tick == b.tick);

    // Stable sort keeps track order among events at the same tick
    key_signatures.sort_by_key(|k| k.tick);

    let context = MidiFileContext {
        ppq,
        tempo_changes,
        time_signatures,
        key_signatures,
    };

    (all_notes, context)
}
