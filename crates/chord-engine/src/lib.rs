pub mod analyzer;
pub mod cache;
pub mod chord_templates;
pub mod chords;
pub mod hash;
pub mod key;
pub mod scales;
pub mod types;
pub mod vocabulary;

pub use analyzer::{ChordAnalyzer, TableAnalyzer};
pub use cache::SongCache;
pub use chords::{extract_root, name_chord};
pub use hash::ContentHash;
pub use key::{detect_scale, ScaleMatch};
pub use scales::{membership, scales_for, PitchClassSet, Scale};
pub use types::{
    ChordLabel, ChordSequence, DetectedScale, IndexSequence, Key, KeyMode, SongChords,
};
pub use vocabulary::{ChordCounter, Vocabulary, VocabularyError};

use std::sync::Arc;

use anyhow::Context;
use chordconf::ExtractionConfig;
use midi_analysis::{PianoRoll, RollParams};
use thiserror::Error;
use tracing::{debug, warn};

/// Current algorithm version, bump to invalidate cache.
pub const CURRENT_VERSION: u32 = 1;

/// Why a song produced no chord record.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("no key signature declared")]
    NoKeySignature,

    #[error("pitch histogram matches no enabled scale")]
    UnmatchedScale,

    #[error(transparent)]
    Malformed(#[from] midi_analysis::Error),
}

impl ExtractError {
    /// Skips are expected corpus content; anything else is a broken file.
    pub fn is_skip(&self) -> bool {
        matches!(self, ExtractError::NoKeySignature | ExtractError::UnmatchedScale)
    }
}

/// Per-song chord extraction pipeline.
///
/// decode → first key signature → tempo normalization → piano roll → bars
/// → pitch-class histogram → scale detection → optional transposition →
/// one chord label per bar. Results are cached in SQLite by
/// `(content_hash, version, fingerprint)` when a cache is attached.
pub struct ChordExtractor {
    analyzer: Arc<dyn ChordAnalyzer>,
    config: ExtractionConfig,
    fingerprint: String,
    cache: Option<SongCache>,
}

impl ChordExtractor {
    /// Create with the default table analyzer and no cache.
    pub fn new(config: ExtractionConfig) -> anyhow::Result<Self> {
        Self::with_analyzer(Arc::new(TableAnalyzer), config)
    }

    /// Create with a custom analyzer.
    pub fn with_analyzer(
        analyzer: Arc<dyn ChordAnalyzer>,
        config: ExtractionConfig,
    ) -> anyhow::Result<Self> {
        let settings = serde_json::to_vec(&config).context("serializing extraction settings")?;
        let fingerprint = ContentHash::from_data(&settings).into_inner();

        Ok(Self {
            analyzer,
            config,
            fingerprint,
            cache: None,
        })
    }

    pub fn with_cache(mut self, cache: SongCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Hash of the extraction settings, part of every cache key.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Extract chords for one song, consulting the cache first.
    ///
    /// Cache failures are logged and fall through to computing.
    pub fn extract(&self, song: &str, midi_bytes: &[u8]) -> Result<SongChords, ExtractError> {
        let content_hash = ContentHash::from_data(midi_bytes);

        if let Some(cache) = &self.cache {
            match cache.get(content_hash.as_str(), CURRENT_VERSION, &self.fingerprint) {
                Ok(Some(mut cached)) => {
                    debug!(song, hash = %content_hash, "chord cache hit");
                    cached.song = song.to_string();
                    return Ok(cached);
                }
                Ok(None) => debug!(song, hash = %content_hash, "chord cache miss"),
                Err(e) => warn!(song, error = %e, "chord cache lookup failed"),
            }
        }

        let record = self.compute(song, content_hash.as_str(), midi_bytes)?;

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.put(&record, &self.fingerprint) {
                warn!(song, error = %e, "chord cache store failed");
            }
        }

        Ok(record)
    }

    /// Run the pipeline on raw MIDI bytes (no cache interaction).
    pub fn compute(
        &self,
        song: &str,
        content_hash: &str,
        midi_bytes: &[u8],
    ) -> Result<SongChords, ExtractError> {
        let (notes, context) = midi_analysis::decode(midi_bytes)?;

        let signature = context
            .first_key_signature()
            .ok_or(ExtractError::NoKeySignature)?;
        let key = Key::from_signature(signature);

        let performance =
            midi_analysis::normalize_tempo(&notes, &context, self.config.target_bpm);
        let params = RollParams {
            fs: self.config.fs,
            double_sample: self.config.double_sample,
            max_samples: self.config.max_roll_samples,
        };
        let roll = PianoRoll::render(&performance, &params)?;
        let bars = roll.bars(self.config.samples_per_bar);
        let histogram = key::song_histogram(&bars);

        let scale_match = self.analyzer.detect_scale(&histogram, &self.config);
        if scale_match == ScaleMatch::NoMatch {
            debug!(song, ?histogram, "no scale matched");
        }

        let (bars, transposed_by) = match (&scale_match, self.config.transpose) {
            (_, false) => (bars, 0),
            (ScaleMatch::Matched(scale), true) => {
                let semitones = key::transposition_for(scale.shift);
                let shifted = roll.transpose(semitones);
                (shifted.bars(self.config.samples_per_bar), semitones)
            }
            (ScaleMatch::NoMatch, true) => return Err(ExtractError::UnmatchedScale),
        };

        let naming_key = key.transpose(transposed_by);
        let chords = self
            .analyzer
            .name_bars(&bars, Some(naming_key), &self.config);

        Ok(SongChords {
            song: song.to_string(),
            content_hash: content_hash.to_string(),
            version: CURRENT_VERSION,
            key,
            key_name: key.name(),
            detected_scale: match scale_match {
                ScaleMatch::Matched(scale) => Some(scale),
                ScaleMatch::NoMatch => None,
            },
            transposed_by,
            histogram,
            chords,
        })
    }
}
