//! Corpus runs.
//!
//! Extraction is two-phase: per-song pipelines run on the worker pool and
//! each returns its record plus a partial [`ChordCounter`]; after every
//! song is in, the counters are merged, the vocabulary is built, and every
//! record is encoded against it.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chord_engine::{ChordCounter, ChordExtractor, SongCache, SongChords, Vocabulary};
use chordconf::ChordrollConfig;
use chrono::Utc;
use tracing::{info, warn};

use crate::corpus;
use crate::report::{RunReport, SongOutcome};
use crate::store::OutputStore;
use crate::workers;

enum Rejection {
    Skip(String),
    Fail(String),
}

/// Build the extractor described by `config`, with its cache if configured.
pub fn build_extractor(config: &ChordrollConfig) -> Result<ChordExtractor> {
    let extractor = ChordExtractor::new(config.extraction.clone())?;
    let Some(db_path) = &config.paths.cache_db else {
        return Ok(extractor);
    };

    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating cache directory {}", parent.display()))?;
    }
    let cache = SongCache::open(db_path)?;
    Ok(extractor.with_cache(cache))
}

/// Extract chords for every song under `paths.input_dir`.
pub async fn run_extract(config: &ChordrollConfig) -> Result<RunReport> {
    config.validate()?;
    let started_at = Utc::now();

    let files = corpus::discover(&config.paths.input_dir)?;
    info!(
        files = files.len(),
        input = %config.paths.input_dir.display(),
        jobs = config.run.jobs,
        "starting chord extraction"
    );

    let extractor = Arc::new(build_extractor(config)?);
    let fingerprint = extractor.fingerprint().to_string();

    let worker = Arc::clone(&extractor);
    let results = workers::map_files(
        files,
        config.run.jobs,
        Duration::from_secs(config.run.file_timeout_secs),
        move |ordinal, file| -> Result<(SongChords, ChordCounter), Rejection> {
            let bytes = std::fs::read(&file.path)
                .map_err(|e| Rejection::Fail(format!("reading file: {e}")))?;
            let record = worker.extract(&file.relative, &bytes).map_err(|e| {
                if e.is_skip() {
                    Rejection::Skip(e.to_string())
                } else {
                    Rejection::Fail(e.to_string())
                }
            })?;
            let counter = ChordCounter::from_song(ordinal, &record.chords);
            Ok((record, counter))
        },
    )
    .await;

    let store = OutputStore::new(&config.paths.output_dir);
    let mut counter = ChordCounter::new();
    let mut records = Vec::new();
    let mut outcomes = Vec::with_capacity(results.len());

    for (file, result) in results {
        let song = file.relative;
        let outcome = match result {
            Ok(Ok((record, partial))) => match store.write_chords(&record) {
                Ok(()) => {
                    counter.merge(partial);
                    let bars = record.chords.len();
                    records.push(record);
                    SongOutcome::Extracted { song, bars }
                }
                Err(e) => {
                    warn!(song = %song, error = %format!("{e:#}"), "failed to persist chords");
                    SongOutcome::Failed {
                        song,
                        cause: format!("{e:#}"),
                    }
                }
            },
            Ok(Err(Rejection::Skip(reason))) => {
                warn!(song = %song, reason = %reason, "skipping song");
                SongOutcome::Skipped { song, reason }
            }
            Ok(Err(Rejection::Fail(cause))) | Err(cause) => {
                warn!(song = %song, cause = %cause, "song failed");
                SongOutcome::Failed { song, cause }
            }
        };
        outcomes.push(outcome);
    }

    // Songs skipped, failed or gone from the corpus keep no outputs from earlier runs
    let extracted: Vec<&str> = records.iter().map(|r| r.song.as_str()).collect();
    let removed = store.prune_songs_except(&extracted)?;
    if removed > 0 {
        info!(removed, "removed outputs of songs not extracted in this run");
    }

    let vocabulary = Vocabulary::from_counter(
        &counter,
        config.vocabulary.num_chords,
        &config.vocabulary.unknown_token,
    )?;
    write_vocabulary_and_indices(&store, &vocabulary, &records)?;

    let report = RunReport {
        started_at,
        finished_at: Utc::now(),
        input_dir: config.paths.input_dir.display().to_string(),
        output_dir: config.paths.output_dir.display().to_string(),
        fingerprint,
        vocabulary_size: vocabulary.len(),
        distinct_chords: counter.distinct(),
        outcomes,
    };
    store.write_report(&report)?;

    info!(
        extracted = report.extracted(),
        skipped = report.skipped(),
        failed = report.failed(),
        vocabulary = report.vocabulary_size,
        distinct_chords = report.distinct_chords,
        bars = counter.total(),
        "chord extraction finished"
    );
    Ok(report)
}

/// Rebuild the vocabulary and index files from persisted chord records.
pub fn run_reindex(config: &ChordrollConfig) -> Result<Vocabulary> {
    config.validate()?;
    let store = OutputStore::new(&config.paths.output_dir);
    let records = store.load_chord_records()?;

    let mut counter = ChordCounter::new();
    for (ordinal, record) in records.iter().enumerate() {
        counter.merge(ChordCounter::from_song(ordinal as u64, &record.chords));
    }

    let vocabulary = Vocabulary::from_counter(
        &counter,
        config.vocabulary.num_chords,
        &config.vocabulary.unknown_token,
    )?;
    write_vocabulary_and_indices(&store, &vocabulary, &records)?;

    info!(
        songs = records.len(),
        vocabulary = vocabulary.len(),
        "re-encoded chord records"
    );
    Ok(vocabulary)
}

fn write_vocabulary_and_indices(
    store: &OutputStore,
    vocabulary: &Vocabulary,
    records: &[SongChords],
) -> Result<()> {
    store.write_vocabulary(vocabulary)?;
    for record in records {
        store.write_index(&record.song, &vocabulary.encode(&record.chords))?;
    }
    Ok(())
}
