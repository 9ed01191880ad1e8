use chordconf::ScaleFamily;
use serde::{Deserialize, Serialize};

use crate::chord_templates::{key_spelling, note_name};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyMode {
    Major,
    Minor,
}

impl std::fmt::Display for KeyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyMode::Major => write!(f, "major"),
            KeyMode::Minor => write!(f, "minor"),
        }
    }
}

/// A key number in 0..24: 0–11 major keys, 12–23 minor keys, tonic = value mod 12.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Key(u8);

impl Key {
    pub fn new(number: u8) -> Option<Self> {
        (number < 24).then_some(Self(number))
    }

    pub fn from_parts(tonic: u8, mode: KeyMode) -> Self {
        let base = match mode {
            KeyMode::Major => 0,
            KeyMode::Minor => 12,
        };
        Self(base + tonic % 12)
    }

    /// Key declared by a MIDI key-signature event.
    pub fn from_signature(signature: &midi_analysis::KeySignature) -> Self {
        Self(signature.key_number())
    }

    pub fn number(&self) -> u8 {
        self.0
    }

    pub fn tonic(&self) -> u8 {
        self.0 % 12
    }

    pub fn mode(&self) -> KeyMode {
        if self.0 < 12 {
            KeyMode::Major
        } else {
            KeyMode::Minor
        }
    }

    /// Same mode, tonic moved by `semitones`.
    pub fn transpose(&self, semitones: i8) -> Self {
        let tonic = (self.tonic() as i16 + semitones as i16).rem_euclid(12) as u8;
        Self::from_parts(tonic, self.mode())
    }

    /// Display name: "C", "F#", "Am", "Bbm".
    pub fn name(&self) -> String {
        let spelling = key_spelling(self.tonic(), self.mode());
        let root = note_name(self.tonic(), spelling);
        match self.mode() {
            KeyMode::Major => root.to_string(),
            KeyMode::Minor => format!("{root}m"),
        }
    }
}

impl TryFrom<u8> for Key {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Key::new(value).ok_or_else(|| format!("key number {value} out of range 0..24"))
    }
}

impl From<Key> for u8 {
    fn from(key: Key) -> u8 {
        key.0
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name())
    }
}

/// One bar's chord name, or the `-` sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChordLabel(String);

impl ChordLabel {
    pub const UNMATCHED: &'static str = "-";

    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn unmatched() -> Self {
        Self(Self::UNMATCHED.to_string())
    }

    pub fn is_unmatched(&self) -> bool {
        self.0 == Self::UNMATCHED
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChordLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChordLabel {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Chord labels in bar order.
pub type ChordSequence = Vec<ChordLabel>;

/// A chord sequence encoded against a vocabulary.
pub type IndexSequence = Vec<u32>;

/// The scale a song's pitch histogram matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedScale {
    pub family: ScaleFamily,
    /// Rotation of the family pattern, 0..12.
    pub shift: u8,
    pub pitch_classes: Vec<u8>,
}

/// Chord extraction result for one song.
///
/// Cached in SQLite by `(content_hash, version, fingerprint)` and persisted
/// per song as `<song>.chords.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongChords {
    /// Song path relative to the corpus root, `/`-separated.
    pub song: String,
    pub content_hash: String,
    /// Algorithm version, cache invalidation on bump
    pub version: u32,
    /// Key of the file's first key-signature event.
    pub key: Key,
    pub key_name: String,
    pub detected_scale: Option<DetectedScale>,
    /// Semitones the song was shifted before naming; 0 when not transposed.
    /// Chords are named in `key.transpose(transposed_by)`.
    pub transposed_by: i8,
    /// Summed activity per pitch class over every bar.
    pub histogram: [u32; 12],
    pub chords: ChordSequence,
}
