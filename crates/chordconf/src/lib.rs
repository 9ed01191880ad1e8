//! Configuration loading for chordroll.
//!
//! One immutable [`ChordrollConfig`] is loaded at startup and passed by
//! reference to every component. Nothing reads configuration from globals.
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/chordroll/config.toml` (system)
//! 2. `~/.config/chordroll/config.toml` (user)
//! 3. `./chordroll.toml` (local override) or the `--config` path
//! 4. Environment variables (`CHORDROLL_*`, `RUST_LOG`)
//!
//! # Example Config
//!
//! ```toml
//! [paths]
//! input_dir = "~/lakh/lmd_matched"
//! output_dir = "~/lakh/chords"
//!
//! [extraction]
//! fs = 4.0
//! samples_per_bar = 8
//! chord_style = "triad"
//! scale_families = ["diatonic", "harmonic"]
//!
//! [vocabulary]
//! num_chords = 50
//!
//! [run]
//! jobs = 8
//! ```

pub mod extraction;
pub mod infra;
pub mod loader;

pub use extraction::{ChordStyle, ExtractionConfig, RootMode, ScaleFamily, VocabularyConfig};
pub use infra::{PathsConfig, RunConfig, TelemetryConfig};
pub use loader::{discover_config_files_with_override, ConfigSources};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {message}")]
    Env { key: String, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete chordroll configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ChordrollConfig {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub extraction: ExtractionConfig,

    #[serde(default)]
    pub vocabulary: VocabularyConfig,

    #[serde(default)]
    pub run: RunConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl ChordrollConfig {
    /// Load configuration from all sources, with `config_path` replacing the
    /// local override, and report where values came from.
    pub fn load_with_sources_from(
        config_path: Option<&std::path::Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut config = ChordrollConfig::default();

        for path in loader::discover_config_files_with_override(config_path) {
            loader::load_into(&mut config, &path)?;
            sources.files.push(path);
        }

        loader::apply_env_overrides(&mut config, &mut sources)?;

        Ok((config, sources))
    }

    /// Reject settings no corpus run can honor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.extraction.validate().map_err(ConfigError::Invalid)?;
        self.vocabulary.validate().map_err(ConfigError::Invalid)?;
        if self.run.jobs == 0 {
            return Err(ConfigError::Invalid("run.jobs must be at least 1".into()));
        }
        if self.run.file_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "run.file_timeout_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> String {
        // Build TOML manually for nicer formatting
        let mut output = String::new();

        output.push_str("# chordroll configuration\n\n");

        output.push_str("[paths]\n");
        output.push_str(&format!(
            "input_dir = \"{}\"\n",
            self.paths.input_dir.display()
        ));
        output.push_str(&format!(
            "output_dir = \"{}\"\n",
            self.paths.output_dir.display()
        ));
        match &self.paths.cache_db {
            Some(path) => output.push_str(&format!("cache_db = \"{}\"\n", path.display())),
            None => output.push_str("# cache_db = \"chord_cache.db\"\n"),
        }

        let ex = &self.extraction;
        output.push_str("\n[extraction]\n");
        output.push_str(&format!("fs = {:?}\n", ex.fs));
        output.push_str(&format!("samples_per_bar = {}\n", ex.samples_per_bar));
        output.push_str(&format!("double_sample = {}\n", ex.double_sample));
        output.push_str(&format!("max_roll_samples = {}\n", ex.max_roll_samples));
        output.push_str(&format!("target_bpm = {:?}\n", ex.target_bpm));
        output.push_str(&format!("chord_style = \"{}\"\n", ex.chord_style));
        output.push_str(&format!("root_mode = \"{}\"\n", ex.root_mode));
        output.push_str(&format!("transpose = {}\n", ex.transpose));
        output.push_str(&format!("key_histogram_size = {}\n", ex.key_histogram_size));
        let families: Vec<String> = ex
            .scale_families
            .iter()
            .map(|f| format!("\"{}\"", f))
            .collect();
        output.push_str(&format!("scale_families = [{}]\n", families.join(", ")));

        output.push_str("\n[vocabulary]\n");
        output.push_str(&format!("num_chords = {}\n", self.vocabulary.num_chords));
        output.push_str(&format!(
            "unknown_token = \"{}\"\n",
            self.vocabulary.unknown_token
        ));

        output.push_str("\n[run]\n");
        output.push_str(&format!("jobs = {}\n", self.run.jobs));
        output.push_str(&format!(
            "file_timeout_secs = {}\n",
            self.run.file_timeout_secs
        ));

        output.push_str("\n[telemetry]\n");
        output.push_str(&format!("log_level = \"{}\"\n", self.telemetry.log_level));

        output
    }
}
