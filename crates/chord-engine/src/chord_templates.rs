//! Scale-degree chord tables and note spelling.
//!
//! Major:  C  → CM7 Dm7 Em7 FM7 G7 Am7 Bm7-5   /  C Dm Em F G Am Bdim
//! Minor:  Am → Am7 Bm7-5 CM7 Dm7 Em7 FM7 G7   /  Am Bdim C Dm Em F G

use chordconf::ChordStyle;

use crate::types::KeyMode;

/// Semitone offsets of the seven degrees above the tonic.
pub const MAJOR_DEGREES: [u8; 7] = [0, 2, 4, 5, 7, 9, 11];
pub const MINOR_DEGREES: [u8; 7] = [0, 2, 3, 5, 7, 8, 10];

const MAJOR_TRIADS: [&str; 7] = ["", "m", "m", "", "", "m", "dim"];
const MAJOR_SEVENTHS: [&str; 7] = ["M7", "m7", "m7", "M7", "7", "m7", "m7-5"];
const MINOR_TRIADS: [&str; 7] = ["m", "dim", "", "m", "m", "", ""];
const MINOR_SEVENTHS: [&str; 7] = ["m7", "m7-5", "M7", "m7", "m7", "M7", "7"];

const NOTE_NAMES_SHARP: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];
const NOTE_NAMES_FLAT: [&str; 12] = [
    "C", "Db", "D", "Eb", "E", "F", "Gb", "G", "Ab", "A", "Bb", "B",
];

/// Accidental convention for a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Spelling {
    Sharps,
    Flats,
}

use Spelling::{Flats, Sharps};

/// Spelling of major keys by tonic: sharps for C G D A E B F#, flats otherwise.
const MAJOR_KEY_SPELLING: [Spelling; 12] = [
    Sharps, Flats, Sharps, Flats, Sharps, Flats, Sharps, Sharps, Flats, Sharps, Flats, Sharps,
];

/// Spelling of minor keys by tonic: sharps for A E B F# C# G# D#, flats otherwise.
const MINOR_KEY_SPELLING: [Spelling; 12] = [
    Flats, Sharps, Flats, Sharps, Sharps, Flats, Sharps, Flats, Sharps, Sharps, Flats, Sharps,
];

pub fn key_spelling(tonic: u8, mode: KeyMode) -> Spelling {
    let idx = (tonic % 12) as usize;
    match mode {
        KeyMode::Major => MAJOR_KEY_SPELLING[idx],
        KeyMode::Minor => MINOR_KEY_SPELLING[idx],
    }
}

pub fn note_name(pitch_class: u8, spelling: Spelling) -> &'static str {
    let idx = (pitch_class % 12) as usize;
    match spelling {
        Sharps => NOTE_NAMES_SHARP[idx],
        Flats => NOTE_NAMES_FLAT[idx],
    }
}

/// Position of `degree` (semitones above the tonic) in the mode's scale.
pub fn degree_index(degree: u8, mode: KeyMode) -> Option<usize> {
    let table = match mode {
        KeyMode::Major => &MAJOR_DEGREES,
        KeyMode::Minor => &MINOR_DEGREES,
    };
    table.iter().position(|&d| d == degree % 12)
}

/// Quality suffix for the chord built on scale position `index`.
pub fn quality_suffix(index: usize, mode: KeyMode, style: ChordStyle) -> &'static str {
    let table = match (mode, style) {
        (KeyMode::Major, ChordStyle::Triad) => &MAJOR_TRIADS,
        (KeyMode::Major, ChordStyle::Seventh) => &MAJOR_SEVENTHS,
        (KeyMode::Minor, ChordStyle::Triad) => &MINOR_TRIADS,
        (KeyMode::Minor, ChordStyle::Seventh) => &MINOR_SEVENTHS,
    };
    table[index % 7]
}
