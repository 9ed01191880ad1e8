//! Chord extraction and vocabulary settings.
//!
//! These values must be identical for every song of a corpus run, so they
//! are loaded once and passed by reference into every pipeline call.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Triad or seventh-chord naming.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChordStyle {
    Triad,
    #[default]
    Seventh,
}

/// How a bar's root is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootMode {
    /// Lowest sounding MIDI pitch, folded to its pitch class.
    #[default]
    LowestPitch,
    /// Fold activity into 12 pitch classes first, take the lowest class.
    LowestPitchClass,
}

/// Scale families known to the key detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleFamily {
    Diatonic,
    Harmonic,
    Melodic,
    Blues,
}

impl ScaleFamily {
    /// Matching order used by the key detector.
    pub const ALL: [ScaleFamily; 4] = [
        ScaleFamily::Diatonic,
        ScaleFamily::Harmonic,
        ScaleFamily::Melodic,
        ScaleFamily::Blues,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScaleFamily::Diatonic => "diatonic",
            ScaleFamily::Harmonic => "harmonic",
            ScaleFamily::Melodic => "melodic",
            ScaleFamily::Blues => "blues",
        }
    }
}

macro_rules! str_enum {
    ($ty:ty { $($name:literal => $variant:expr),+ $(,)? }) => {
        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($name => Ok($variant),)+
                    other => Err(format!(
                        "unknown {} '{}' (expected one of: {})",
                        stringify!($ty),
                        other,
                        [$($name),+].join(", ")
                    )),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                $(if *self == $variant { return f.write_str($name); })+
                Ok(())
            }
        }
    };
}

str_enum!(ChordStyle { "triad" => ChordStyle::Triad, "seventh" => ChordStyle::Seventh });
str_enum!(RootMode {
    "lowest_pitch" => RootMode::LowestPitch,
    "lowest_pitch_class" => RootMode::LowestPitchClass,
});
str_enum!(ScaleFamily {
    "diatonic" => ScaleFamily::Diatonic,
    "harmonic" => ScaleFamily::Harmonic,
    "melodic" => ScaleFamily::Melodic,
    "blues" => ScaleFamily::Blues,
});

/// Per-song extraction parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Roll samples per second after tempo normalization.
    /// Default: 4.0
    pub fs: f64,

    /// Roll samples per bar.
    /// Default: 8 (one 4/4 bar at 120 BPM and fs = 4)
    pub samples_per_bar: usize,

    /// Render at 2·fs and fold back, catching notes shorter than a sample.
    /// Default: true
    pub double_sample: bool,

    /// Widest roll a song may render to, in samples at `fs`. Longer songs fail.
    /// Default: 1000000
    pub max_roll_samples: usize,

    /// Tempo every file is re-timed to before rendering.
    /// Default: 120.0
    pub target_bpm: f64,

    /// Default: seventh
    pub chord_style: ChordStyle,

    /// Default: lowest_pitch
    pub root_mode: RootMode,

    /// Transpose each song by its detected scale shift before naming.
    /// Default: false
    pub transpose: bool,

    /// Number of most active pitch classes compared against scales.
    /// Default: 7
    pub key_histogram_size: usize,

    /// Families the key detector may match, in matching order.
    /// Default: [diatonic]
    pub scale_families: Vec<ScaleFamily>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            fs: 4.0,
            samples_per_bar: 8,
            double_sample: true,
            max_roll_samples: 1_000_000,
            target_bpm: 120.0,
            chord_style: ChordStyle::Seventh,
            root_mode: RootMode::LowestPitch,
            transpose: false,
            key_histogram_size: 7,
            scale_families: vec![ScaleFamily::Diatonic],
        }
    }
}

impl ExtractionConfig {
    /// Enabled families in the detector's fixed matching order.
    pub fn enabled_families(&self) -> Vec<ScaleFamily> {
        ScaleFamily::ALL
            .into_iter()
            .filter(|f| self.scale_families.contains(f))
            .collect()
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.fs.is_finite() || self.fs <= 0.0 {
            return Err(format!("extraction.fs must be positive, got {}", self.fs));
        }
        if self.samples_per_bar == 0 {
            return Err("extraction.samples_per_bar must be at least 1".into());
        }
        if self.max_roll_samples < self.samples_per_bar {
            return Err(format!(
                "extraction.max_roll_samples must hold at least one bar ({}), got {}",
                self.samples_per_bar, self.max_roll_samples
            ));
        }
        if !self.target_bpm.is_finite() || self.target_bpm <= 0.0 {
            return Err(format!(
                "extraction.target_bpm must be positive, got {}",
                self.target_bpm
            ));
        }
        if !(1..=12).contains(&self.key_histogram_size) {
            return Err(format!(
                "extraction.key_histogram_size must be in 1..=12, got {}",
                self.key_histogram_size
            ));
        }
        if self.scale_families.is_empty() {
            return Err("extraction.scale_families must enable at least one family".into());
        }
        Ok(())
    }
}

/// Corpus vocabulary settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularyConfig {
    /// Total slots including the out-of-vocabulary slot at index 0.
    /// Default: 50
    pub num_chords: usize,

    /// Label stored at index 0.
    /// Default: <unk>
    pub unknown_token: String,
}

impl Default for VocabularyConfig {
    fn default() -> Self {
        Self {
            num_chords: 50,
            unknown_token: "<unk>".to_string(),
        }
    }
}

impl VocabularyConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.num_chords <= 1 {
            return Err(format!(
                "vocabulary.num_chords must be greater than 1, got {}",
                self.num_chords
            ));
        }
        if self.unknown_token.is_empty() {
            return Err("vocabulary.unknown_token must not be empty".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_parse_and_display() {
        assert_eq!("Triad".parse::<ChordStyle>().unwrap(), ChordStyle::Triad);
        assert_eq!(ChordStyle::Seventh.to_string(), "seventh");
        assert_eq!(
            "lowest_pitch_class".parse::<RootMode>().unwrap(),
            RootMode::LowestPitchClass
        );
        assert_eq!(ScaleFamily::Blues.to_string(), "blues");
        assert!("ninth".parse::<ChordStyle>().is_err());
    }

    #[test]
    fn enabled_families_use_fixed_order() {
        let config = ExtractionConfig {
            scale_families: vec![ScaleFamily::Blues, ScaleFamily::Diatonic, ScaleFamily::Blues],
            ..Default::default()
        };
        assert_eq!(
            config.enabled_families(),
            vec![ScaleFamily::Diatonic, ScaleFamily::Blues]
        );
    }

    #[test]
    fn defaults_validate() {
        assert!(ExtractionConfig::default().validate().is_ok());
        assert!(VocabularyConfig::default().validate().is_ok());
    }

    #[test]
    fn invalid_values_rejected() {
        let bad_bar = ExtractionConfig {
            samples_per_bar: 0,
            ..Default::default()
        };
        assert!(bad_bar.validate().is_err());

        let no_family = ExtractionConfig {
            scale_families: vec![],
            ..Default::default()
        };
        assert!(no_family.validate().is_err());

        let no_room = ExtractionConfig {
            max_roll_samples: 4,
            ..Default::default()
        };
        assert!(no_room.validate().is_err());

        let one_slot = VocabularyConfig {
            num_chords: 1,
            ..Default::default()
        };
        assert!(one_slot.validate().is_err());
    }
}
