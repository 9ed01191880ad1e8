//! Fixed-tempo rewrite of a corpus.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chordconf::ChordrollConfig;
use midi_analysis::{write_fixed_tempo, ExportOptions};
use tracing::{info, warn};

use crate::corpus;
use crate::workers;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NormalizeSummary {
    pub written: usize,
    /// `(song, cause)` for every file that could not be rewritten.
    pub failed: Vec<(String, String)>,
}

/// Rewrite every MIDI file under `paths.input_dir` into `output_dir` at
/// `extraction.target_bpm`, mirroring the directory tree.
///
/// The first key signature of each file is carried over; later ones and
/// every tempo change are dropped.
pub async fn run_normalize_tempo(
    config: &ChordrollConfig,
    output_dir: &Path,
) -> Result<NormalizeSummary> {
    config.validate()?;
    let files = corpus::discover(&config.paths.input_dir)?;
    info!(
        files = files.len(),
        output = %output_dir.display(),
        bpm = config.extraction.target_bpm,
        "normalizing tempo"
    );

    let target_bpm = config.extraction.target_bpm;
    let output_root = output_dir.to_path_buf();
    let results = workers::map_files(
        files,
        config.run.jobs,
        Duration::from_secs(config.run.file_timeout_secs),
        move |_, file| rewrite(&file.path, &output_root.join(&file.relative), target_bpm),
    )
    .await;

    let mut summary = NormalizeSummary::default();
    for (file, result) in results {
        match result.and_then(|r| r.map_err(|e| format!("{e:#}"))) {
            Ok(_) => summary.written += 1,
            Err(cause) => {
                warn!(song = %file.relative, cause = %cause, "tempo rewrite failed");
                summary.failed.push((file.relative, cause));
            }
        }
    }

    info!(written = summary.written, failed = summary.failed.len(), "tempo normalization finished");
    Ok(summary)
}

fn rewrite(source: &Path, target: &Path, target_bpm: f64) -> Result<PathBuf> {
    let bytes = std::fs::read(source).with_context(|| format!("reading {}", source.display()))?;
    let (notes, context) = midi_analysis::decode(&bytes)?;

    let options = ExportOptions {
        target_bpm,
        key_signature: context.first_key_signature().copied(),
    };
    let rewritten = write_fixed_tempo(&notes, &context, &options);

    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }
    std::fs::write(target, rewritten).with_context(|| format!("writing {}", target.display()))?;
    Ok(target.to_path_buf())
}
