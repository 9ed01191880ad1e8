use serde::{Deserialize, Serialize};

/// MIDI channel reserved for General MIDI percussion.
pub const PERCUSSION_CHANNEL: u8 = 9;

/// A single MIDI note with absolute tick timing and source metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedNote {
    pub onset_tick: u64,
    pub offset_tick: u64,
    pub pitch: u8,
    pub velocity: u8,
    pub channel: u8,
    pub track_index: usize,
}

impl TimedNote {
    pub fn duration_ticks(&self) -> u64 {
        self.offset_tick.saturating_sub(self.onset_tick)
    }

    pub fn is_percussion(&self) -> bool {
        self.channel == PERCUSSION_CHANNEL
    }
}

/// A note placed on a wall-clock timeline, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformedNote {
    pub onset: f64,
    pub offset: f64,
    pub pitch: u8,
    pub velocity: u8,
}

/// A pitched performance ready for piano-roll rendering.
///
/// Percussion is already filtered out; `end_seconds` is the latest note
/// offset and fixes the width of the rendered roll.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Performance {
    pub notes: Vec<PerformedNote>,
    pub end_seconds: f64,
}

impl Performance {
    pub fn new(notes: Vec<PerformedNote>) -> Self {
        let end_seconds = notes.iter().map(|n| n.offset).fold(0.0_f64, f64::max);
        Self { notes, end_seconds }
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}
