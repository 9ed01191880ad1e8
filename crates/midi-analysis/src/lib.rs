pub mod analyze;
pub mod midi_writer;
pub mod note;
pub mod piano_roll;
pub mod tempo;

pub use analyze::{decode, extract_notes, KeySignature, MidiFileContext, TempoChange, TimeSignature};
pub use midi_writer::{write_fixed_tempo, ExportOptions};
pub use note::{PerformedNote, Performance, TimedNote};
pub use piano_roll::{BarActivity, PianoRoll, RollParams, PITCH_COUNT};
pub use tempo::normalize_tempo;

/// Errors from MIDI analysis operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("MIDI parse error: {0}")]
    MidiParse(String),

    #[error("invalid roll parameters: {0}")]
    InvalidParams(String),
}

pub type Result<T> = std::result::Result<T, Error>;
