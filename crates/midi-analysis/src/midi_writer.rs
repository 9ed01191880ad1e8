use crate::analyze::{KeySignature, MidiFileContext};
use crate::note::TimedNote;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Options for fixed-tempo MIDI export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportOptions {
    /// The single tempo written to the conductor track. Default: 120.
    pub target_bpm: f64,
    /// Key signature written at tick 0, if any.
    pub key_signature: Option<KeySignature>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            target_bpm: 120.0,
            key_signature: None,
        }
    }
}

/// Write notes to Standard MIDI File format 1 bytes with a single tempo.
///
/// Track 0: one tempo event, time signatures (from context), optional key.
/// Tracks 1+: one per distinct source track, notes on their original channels.
pub fn write_fixed_tempo(
    notes: &[TimedNote],
    context: &MidiFileContext,
    options: &ExportOptions,
) -> Vec<u8> {
    let mut tracks: Vec<Vec<u8>> = vec![build_conductor_track(context, options)];

    let mut by_track: BTreeMap<usize, Vec<&TimedNote>> = BTreeMap::new();
    for note in notes {
        by_track.entry(note.track_index).or_default().push(note);
    }
    for track_notes in by_track.values() {
        tracks.push(build_note_track(track_notes));
    }

    build_midi_file(context.ppq, &tracks)
}

/// Build the tempo/time-signature/key track.
fn build_conductor_track(context: &MidiFileContext, options: &ExportOptions) -> Vec<u8> {
    let mut events: Vec<(u64, Vec<u8>)> = Vec::new();

    let bpm = if options.target_bpm.is_finite() && options.target_bpm > 0.0 {
        options.target_bpm
    } else {
        120.0
    };
    let usec = ((60_000_000.0 / bpm).round() as u32).clamp(1, 0x00FF_FFFF);
    events.push((
        0,
        vec![
            0xFF,
            0x51,
            0x03,
            (usec >> 16) as u8,
            (usec >> 8) as u8,
            usec as u8,
        ],
    ));

    for ts in &context.time_signatures {
        let denom_pow = ts.denominator.max(1).trailing_zeros() as u8;
        events.push((
            ts.tick,
            vec![0xFF, 0x58, 0x04, ts.numerator, denom_pow, 0x18, 0x08],
        ));
    }

    if let Some(key) = options.key_signature {
        events.push((0, vec![0xFF, 0x59, 0x02, key.sharps as u8, key.minor as u8]));
    }

    events.sort_by_key(|(tick, _)| *tick);
    encode_events(events)
}

/// Build a track holding one source track's notes.
fn build_note_track(notes: &[&TimedNote]) -> Vec<u8> {
    let mut events: Vec<(u64, Vec<u8>)> = Vec::with_capacity(notes.len() * 2);

    for note in notes {
        let channel = note.channel & 0x0F;
        events.push((note.onset_tick, vec![0x90 | channel, note.pitch, note.velocity.max(1)]));
        events.push((note.offset_tick, vec![0x80 | channel, note.pitch, 0]));
    }

    // Sort by tick, with note-offs before note-ons at the same tick
    events.sort_by(|a, b| {
        a.0.cmp(&b.0).then_with(|| {
            let a_is_off = a.1.first().is_some_and(|b| b & 0xF0 == 0x80);
            let b_is_off = b.1.first().is_some_and(|b| b & 0xF0 == 0x80);
            b_is_off.cmp(&a_is_off)
        })
    });

    encode_events(events)
}

/// Largest delta-time a single VLQ may carry.
const MAX_DELTA: u64 = 0x0FFF_FFFF;

/// Empty text meta event, used to carry the excess of an over-long gap.
const FILLER_EVENT: [u8; 3] = [0xFF, 0x01, 0x00];

fn encode_events(events: Vec<(u64, Vec<u8>)>) -> Vec<u8> {
    let mut track_data = Vec::new();
    let mut last_tick = 0u64;

    for (tick, data) in events {
        let mut delta = tick.saturating_sub(last_tick);
        while delta > MAX_DELTA {
            write_vlq(&mut track_data, MAX_DELTA as u32);
            track_data.extend_from_slice(&FILLER_EVENT);
            delta -= MAX_DELTA;
        }
        write_vlq(&mut track_data, delta as u32);
        track_data.extend_from_slice(&data);
        last_tick = tick;
    }

    // End of track
    write_vlq(&mut track_data, 0);
    track_data.extend_from_slice(&[0xFF, 0x2F, 0x00]);

    track_data
}

/// Assemble a complete MIDI file from track data blobs.
fn build_midi_file(ppq: u16, tracks: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = Vec::new();

    // MThd header
    buf.extend_from_slice(b"MThd");
    buf.extend_from_slice(&6u32.to_be_bytes());
    buf.extend_from_slice(&1u16.to_be_bytes()); // format 1
    buf.extend_from_slice(&(tracks.len() as u16).to_be_bytes());
    buf.extend_from_slice(&ppq.to_be_bytes());

    for track_data in tracks {
        buf.extend_from_slice(b"MTrk");
        buf.extend_from_slice(&(track_data.len() as u32).to_be_bytes());
        buf.extend_from_slice(track_data);
    }

    buf
}

/// Write a variable-length quantity to a byte buffer.
fn write_vlq(buf: &mut Vec<u8>, mut value: u32) {
    if value == 0 {
        buf.push(0);
        return;
    }

    let mut bytes = Vec::new();
    bytes.push((value & 0x7F) as u8);
    value >>= 7;

    while value > 0 {
        bytes.push((value & 0x7F) as u8 | 0x80);
        value >>= 7;
    }

    bytes.reverse();
    buf.extend_from_slice(&bytes);
}
