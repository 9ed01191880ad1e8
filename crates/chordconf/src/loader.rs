//! Config file discovery, loading, and environment variable overlay.

use crate::{ChordrollConfig, ConfigError, ScaleFamily};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
/// Returns paths in load order (system, user, local/cli).
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/chordroll/config.toml");
    if system.exists() {
        files.push(system);
    }

    // User config (XDG_CONFIG_HOME or ~/.config)
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("chordroll/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    // CLI override takes precedence over local
    if let Some(path) = cli_path {
        files.push(path.to_path_buf());
        return files;
    }

    let local = PathBuf::from("chordroll.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Layer a TOML file over `config`. Keys absent from the file keep their value.
pub fn load_into(config: &mut ChordrollConfig, path: &Path) -> Result<(), ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    apply_toml_str(config, &contents, path)
}

/// Layer TOML text over `config`; `path` is only used in error messages.
pub fn apply_toml_str(
    config: &mut ChordrollConfig,
    contents: &str,
    path: &Path,
) -> Result<(), ConfigError> {
    let table: toml::Table = contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let section = Section { path };

    if let Some(paths) = section.table(&table, "paths")? {
        if let Some(v) = section.str(paths, "input_dir")? {
            config.paths.input_dir = expand_path(v);
        }
        if let Some(v) = section.str(paths, "output_dir")? {
            config.paths.output_dir = expand_path(v);
        }
        if let Some(v) = section.str(paths, "cache_db")? {
            config.paths.cache_db = Some(expand_path(v));
        }
    }

    if let Some(ex) = section.table(&table, "extraction")? {
        let target = &mut config.extraction;
        if let Some(v) = section.float(ex, "fs")? {
            target.fs = v;
        }
        if let Some(v) = section.count(ex, "samples_per_bar")? {
            target.samples_per_bar = v;
        }
        if let Some(v) = section.bool(ex, "double_sample")? {
            target.double_sample = v;
        }
        if let Some(v) = section.count(ex, "max_roll_samples")? {
            target.max_roll_samples = v;
        }
        if let Some(v) = section.float(ex, "target_bpm")? {
            target.target_bpm = v;
        }
        if let Some(v) = section.str(ex, "chord_style")? {
            target.chord_style = v.parse().map_err(|m| section.error("chord_style", m))?;
        }
        if let Some(v) = section.str(ex, "root_mode")? {
            target.root_mode = v.parse().map_err(|m| section.error("root_mode", m))?;
        }
        if let Some(v) = section.bool(ex, "transpose")? {
            target.transpose = v;
        }
        if let Some(v) = section.count(ex, "key_histogram_size")? {
            target.key_histogram_size = v;
        }
        if let Some(values) = ex.get("scale_families") {
            let array = values
                .as_array()
                .ok_or_else(|| section.error("scale_families", "expected an array".into()))?;
            target.scale_families = array
                .iter()
                .map(|v| {
                    v.as_str()
                        .ok_or_else(|| "expected a string".to_string())
                        .and_then(|s| s.parse::<ScaleFamily>())
                        .map_err(|m| section.error("scale_families", m))
                })
                .collect::<Result<_, _>>()?;
        }
    }

    if let Some(vocab) = section.table(&table, "vocabulary")? {
        if let Some(v) = section.count(vocab, "num_chords")? {
            config.vocabulary.num_chords = v;
        }
        if let Some(v) = section.str(vocab, "unknown_token")? {
            config.vocabulary.unknown_token = v.to_string();
        }
    }

    if let Some(run) = section.table(&table, "run")? {
        if let Some(v) = section.count(run, "jobs")? {
            config.run.jobs = v;
        }
        if let Some(v) = section.count(run, "file_timeout_secs")? {
            config.run.file_timeout_secs = v as u64;
        }
    }

    if let Some(telemetry) = section.table(&table, "telemetry")? {
        if let Some(v) = section.str(telemetry, "log_level")? {
            config.telemetry.log_level = v.to_string();
        }
    }

    Ok(())
}

/// Typed accessors that turn wrong-typed values into parse errors.
struct Section<'a> {
    path: &'a Path,
}

impl<'a> Section<'a> {
    fn error(&self, key: &str, message: String) -> ConfigError {
        ConfigError::Parse {
            path: self.path.to_path_buf(),
            message: format!("{}: {}", key, message),
        }
    }

    fn table<'t>(&self, table: &'t toml::Table, key: &str) -> Result<Option<&'t toml::Table>, ConfigError> {
        match table.get(key) {
            None => Ok(None),
            Some(v) => v
                .as_table()
                .map(Some)
                .ok_or_else(|| self.error(key, "expected a table".into())),
        }
    }

    fn str<'t>(&self, table: &'t toml::Table, key: &str) -> Result<Option<&'t str>, ConfigError> {
        match table.get(key) {
            None => Ok(None),
            Some(v) => v
                .as_str()
                .map(Some)
                .ok_or_else(|| self.error(key, "expected a string".into())),
        }
    }

    fn float(&self, table: &toml::Table, key: &str) -> Result<Option<f64>, ConfigError> {
        match table.get(key) {
            None => Ok(None),
            Some(toml::Value::Float(f)) => Ok(Some(*f)),
            Some(toml::Value::Integer(i)) => Ok(Some(*i as f64)),
            Some(_) => Err(self.error(key, "expected a number".into())),
        }
    }

    fn count(&self, table: &toml::Table, key: &str) -> Result<Option<usize>, ConfigError> {
        match table.get(key) {
            None => Ok(None),
            Some(toml::Value::Integer(i)) => usize::try_from(*i)
                .map(Some)
                .map_err(|_| self.error(key, format!("must not be negative, got {}", i))),
            Some(_) => Err(self.error(key, "expected an integer".into())),
        }
    }

    fn bool(&self, table: &toml::Table, key: &str) -> Result<Option<bool>, ConfigError> {
        match table.get(key) {
            None => Ok(None),
            Some(v) => v
                .as_bool()
                .map(Some)
                .ok_or_else(|| self.error(key, "expected a boolean".into())),
        }
    }
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(
    config: &mut ChordrollConfig,
    sources: &mut ConfigSources,
) -> Result<(), ConfigError> {
    apply_env_overrides_from(config, sources, env::vars())
}

/// Apply overrides from an explicit variable list (testable without touching the process env).
pub fn apply_env_overrides_from(
    config: &mut ChordrollConfig,
    sources: &mut ConfigSources,
    vars: impl IntoIterator<Item = (String, String)>,
) -> Result<(), ConfigError> {
    fn parsed<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError>
    where
        T::Err: std::fmt::Display,
    {
        value.trim().parse::<T>().map_err(|e| ConfigError::Env {
            key: key.to_string(),
            message: e.to_string(),
        })
    }

    let mut rust_log = None;

    for (key, value) in vars {
        match key.as_str() {
            "CHORDROLL_INPUT_DIR" => config.paths.input_dir = expand_path(&value),
            "CHORDROLL_OUTPUT_DIR" => config.paths.output_dir = expand_path(&value),
            "CHORDROLL_CACHE_DB" => config.paths.cache_db = Some(expand_path(&value)),
            "CHORDROLL_FS" => config.extraction.fs = parsed(&key, &value)?,
            "CHORDROLL_SAMPLES_PER_BAR" => {
                config.extraction.samples_per_bar = parsed(&key, &value)?
            }
            "CHORDROLL_CHORD_STYLE" => config.extraction.chord_style = parsed(&key, &value)?,
            "CHORDROLL_NUM_CHORDS" => config.vocabulary.num_chords = parsed(&key, &value)?,
            "CHORDROLL_JOBS" => config.run.jobs = parsed(&key, &value)?,
            "CHORDROLL_LOG_LEVEL" => config.telemetry.log_level = value.clone(),
            // Applied last so it wins over CHORDROLL_LOG_LEVEL
            "RUST_LOG" => {
                rust_log = Some(value.clone());
            }
            _ => continue,
        }
        sources.env_overrides.push(key);
    }

    if let Some(filter) = rust_log {
        config.telemetry.log_level = filter;
    }

    Ok(())
}

/// Expand ~ and environment variables in a path.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            home.join(stripped)
        } else {
            PathBuf::from(path)
        }
    } else if let Some(stripped) = path.strip_prefix('$') {
        // Handle $VAR/rest/of/path
        if let Some(slash_pos) = stripped.find('/') {
            let var_name = &stripped[..slash_pos];
            if let Ok(var_value) = env::var(var_name) {
                PathBuf::from(var_value).join(&stripped[slash_pos + 1..])
            } else {
                PathBuf::from(path)
            }
        } else {
            env::var(stripped)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(path))
        }
    } else {
        PathBuf::from(path)
    }
}
