//! Run infrastructure: where data lives, how much runs at once, logging.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Filesystem locations for a corpus run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root of the MIDI corpus.
    /// Default: data/original
    #[serde(default = "PathsConfig::default_input_dir")]
    pub input_dir: PathBuf,

    /// Root for chord records, vocabulary and the run report.
    /// Default: data/chords
    #[serde(default = "PathsConfig::default_output_dir")]
    pub output_dir: PathBuf,

    /// SQLite cache of per-song results. Disabled when unset.
    #[serde(default)]
    pub cache_db: Option<PathBuf>,
}

impl PathsConfig {
    fn default_input_dir() -> PathBuf {
        PathBuf::from("data/original")
    }

    fn default_output_dir() -> PathBuf {
        PathBuf::from("data/chords")
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input_dir: Self::default_input_dir(),
            output_dir: Self::default_output_dir(),
            cache_db: None,
        }
    }
}

/// Worker pool sizing and per-file limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Files processed concurrently.
    /// Default: available parallelism
    #[serde(default = "RunConfig::default_jobs")]
    pub jobs: usize,

    /// Per-file wall-clock limit for read + decode + extraction.
    /// Default: 30
    #[serde(default = "RunConfig::default_file_timeout_secs")]
    pub file_timeout_secs: u64,
}

impl RunConfig {
    fn default_jobs() -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
    }

    fn default_file_timeout_secs() -> u64 {
        30
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            jobs: Self::default_jobs(),
            file_timeout_secs: Self::default_file_timeout_secs(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log filter (trace, debug, info, warn, error, or an EnvFilter directive).
    /// Default: info
    #[serde(default = "TelemetryConfig::default_log_level")]
    pub log_level: String,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}
