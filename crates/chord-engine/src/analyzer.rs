use chordconf::ExtractionConfig;
use midi_analysis::BarActivity;

use crate::chords::name_bars;
use crate::key::{detect_scale, ScaleMatch};
use crate::types::{ChordSequence, Key};

/// Trait for the harmonic stages of the per-song pipeline.
///
/// `TableAnalyzer` matches scale tables and names chords by scale degree.
/// Swapping the analyzer leaves decoding, rendering and caching untouched.
pub trait ChordAnalyzer: Send + Sync {
    fn detect_scale(&self, histogram: &[u32; 12], config: &ExtractionConfig) -> ScaleMatch;

    fn name_bars(
        &self,
        bars: &[BarActivity],
        key: Option<Key>,
        config: &ExtractionConfig,
    ) -> ChordSequence;
}

/// Scale-table key detection and lowest-note root naming.
pub struct TableAnalyzer;

impl ChordAnalyzer for TableAnalyzer {
    fn detect_scale(&self, histogram: &[u32; 12], config: &ExtractionConfig) -> ScaleMatch {
        detect_scale(histogram, config)
    }

    fn name_bars(
        &self,
        bars: &[BarActivity],
        key: Option<Key>,
        config: &ExtractionConfig,
    ) -> ChordSequence {
        name_bars(bars, key, config)
    }
}
