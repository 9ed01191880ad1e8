//! Corpus enumeration.
//!
//! Files are returned in lexicographic order of their `/`-separated path
//! relative to the corpus root. Song ordinals, and through them the
//! vocabulary's tie-breaking, depend on this order.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use tracing::warn;

/// A MIDI file inside the corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusFile {
    pub path: PathBuf,
    /// Path relative to the corpus root, `/`-separated.
    pub relative: String,
}

pub fn is_midi(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("mid") || ext.eq_ignore_ascii_case("midi"))
}

/// Every `.mid`/`.midi` file below `root`.
///
/// Unreadable directory entries are logged and left out.
pub fn discover(root: &Path) -> Result<Vec<CorpusFile>> {
    if !root.is_dir() {
        bail!("input directory {} does not exist", root.display());
    }

    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(root).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable corpus entry");
                continue;
            }
        };
        if !entry.file_type().is_file() || !is_midi(entry.path()) {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        files.push(CorpusFile {
            relative: relative_string(relative),
            path: entry.into_path(),
        });
    }

    files.sort_by(|a, b| a.relative.cmp(&b.relative));
    Ok(files)
}

/// Join path components with `/` regardless of platform.
pub fn relative_string(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn finds_midi_files_in_path_order() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("b/deep")).unwrap();
        std::fs::create_dir_all(root.join("a")).unwrap();
        for name in ["b/deep/x.mid", "a/song.MIDI", "a.mid", "b/one.mid", "notes.txt"] {
            std::fs::write(root.join(name), b"").unwrap();
        }

        let found: Vec<String> = discover(root)
            .unwrap()
            .into_iter()
            .map(|f| f.relative)
            .collect();
        assert_eq!(found, vec!["a.mid", "a/song.MIDI", "b/deep/x.mid", "b/one.mid"]);
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(discover(&dir.path().join("nope")).is_err());
    }
}
