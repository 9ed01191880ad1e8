//! Scale detection from a song's pitch-class histogram.
//!
//! The most active pitch classes of the song are compared against every
//! transposition of each enabled scale family. Families are tried in the
//! fixed order diatonic, harmonic, melodic, blues and rotations in 0..12;
//! the first scale containing the active set wins.

use chordconf::ExtractionConfig;
use midi_analysis::BarActivity;

use crate::scales::{pattern, scales_for, PitchClassSet};
use crate::types::DetectedScale;

/// Outcome of matching a histogram against the scale table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScaleMatch {
    Matched(DetectedScale),
    NoMatch,
}

impl ScaleMatch {
    pub fn detected(&self) -> Option<&DetectedScale> {
        match self {
            ScaleMatch::Matched(scale) => Some(scale),
            ScaleMatch::NoMatch => None,
        }
    }
}

/// Sum every bar's activity into a 12-bin pitch-class histogram.
pub fn song_histogram(bars: &[BarActivity]) -> [u32; 12] {
    let mut histogram = [0u32; 12];
    for bar in bars {
        for (pc, sum) in bar.pitch_class_sums().iter().enumerate() {
            histogram[pc] = histogram[pc].saturating_add(*sum);
        }
    }
    histogram
}

/// The `n` most active pitch classes with nonzero activity.
///
/// Equal counts rank the lower pitch class first.
pub fn active_set(histogram: &[u32; 12], n: usize) -> PitchClassSet {
    let mut ranked: Vec<(u8, u32)> = histogram
        .iter()
        .enumerate()
        .filter(|&(_, &count)| count > 0)
        .map(|(pc, &count)| (pc as u8, count))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.into_iter().take(n).map(|(pc, _)| pc).collect()
}

/// Find the first enabled scale that contains the song's active pitch classes.
pub fn detect_scale(histogram: &[u32; 12], config: &ExtractionConfig) -> ScaleMatch {
    for family in config.enabled_families() {
        let size = pattern(family).len();
        let active = active_set(histogram, config.key_histogram_size.min(size));
        if active.is_empty() {
            return ScaleMatch::NoMatch;
        }

        if let Some(scale) = scales_for(family)
            .into_iter()
            .find(|scale| active.is_subset_of(&scale.set))
        {
            return ScaleMatch::Matched(DetectedScale {
                family,
                shift: scale.rotation,
                pitch_classes: scale.pitch_classes(),
            });
        }
    }
    ScaleMatch::NoMatch
}

/// Semitones that move a scale at `shift` back to rotation 0, by the shorter way.
pub fn transposition_for(shift: u8) -> i8 {
    let shift = (shift % 12) as i8;
    if shift > 6 {
        12 - shift
    } else {
        -shift
    }
}
