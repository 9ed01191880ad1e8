//! Output directory layout.
//!
//! ```text
//! <output_dir>/
//!   chord_to_index.json
//!   index_to_chord.json
//!   run_report.json
//!   <relative/dir>/<song>.chords.json
//!   <relative/dir>/<song>.index.json
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chord_engine::{IndexSequence, SongChords, Vocabulary};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::report::RunReport;

pub const CHORD_TO_INDEX: &str = "chord_to_index.json";
pub const INDEX_TO_CHORD: &str = "index_to_chord.json";
pub const RUN_REPORT: &str = "run_report.json";

const CHORDS_SUFFIX: &str = ".chords.json";
const INDEX_SUFFIX: &str = ".index.json";

pub struct OutputStore {
    root: PathBuf,
}

impl OutputStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `<root>/<dir>/<stem><suffix>` for a song at `<dir>/<stem>.mid`.
    fn song_path(&self, song: &str, suffix: &str) -> PathBuf {
        let relative = Path::new(song);
        let stem = relative
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| song.to_string());
        let dir = relative.parent().map(|p| self.root.join(p)).unwrap_or_else(|| self.root.clone());
        dir.join(format!("{stem}{suffix}"))
    }

    pub fn chords_path(&self, song: &str) -> PathBuf {
        self.song_path(song, CHORDS_SUFFIX)
    }

    pub fn index_path(&self, song: &str) -> PathBuf {
        self.song_path(song, INDEX_SUFFIX)
    }

    pub fn write_chords(&self, record: &SongChords) -> Result<()> {
        write_json(&self.chords_path(&record.song), record)
    }

    pub fn write_index(&self, song: &str, indices: &IndexSequence) -> Result<()> {
        write_json(&self.index_path(song), indices)
    }

    pub fn read_index(&self, song: &str) -> Result<IndexSequence> {
        read_json(&self.index_path(song))
    }

    pub fn write_vocabulary(&self, vocabulary: &Vocabulary) -> Result<()> {
        write_json(&self.root.join(CHORD_TO_INDEX), &vocabulary.chord_to_index_map())?;
        write_json(&self.root.join(INDEX_TO_CHORD), &vocabulary.index_to_chord_map())
    }

    pub fn read_vocabulary(&self) -> Result<Vocabulary> {
        let map: BTreeMap<String, u32> = read_json(&self.root.join(CHORD_TO_INDEX))?;
        Vocabulary::from_chord_to_index(&map)
            .with_context(|| format!("loading {}", self.root.join(CHORD_TO_INDEX).display()))
    }

    pub fn write_report(&self, report: &RunReport) -> Result<()> {
        write_json(&self.root.join(RUN_REPORT), report)
    }

    pub fn read_report(&self) -> Result<RunReport> {
        read_json(&self.root.join(RUN_REPORT))
    }

    /// Delete the chord and index files of every song not in `songs`.
    ///
    /// Returns how many files were removed.
    pub fn prune_songs_except(&self, songs: &[&str]) -> Result<usize> {
        let keep: HashSet<PathBuf> = songs
            .iter()
            .flat_map(|song| [self.chords_path(song), self.index_path(song)])
            .collect();

        let mut removed = 0;
        for entry in walkdir::WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && is_song_output(e.file_name()))
        {
            if keep.contains(entry.path()) {
                continue;
            }
            std::fs::remove_file(entry.path())
                .with_context(|| format!("removing {}", entry.path().display()))?;
            removed += 1;
        }
        Ok(removed)
    }

    /// Every persisted chord record, ordered by song path.
    ///
    /// Records that fail to parse are logged and left out.
    pub fn load_chord_records(&self) -> Result<Vec<SongChords>> {
        let mut records = Vec::new();
        for entry in walkdir::WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.file_type().is_file()
                    && e.file_name().to_string_lossy().ends_with(CHORDS_SUFFIX)
            })
        {
            match read_json::<SongChords>(entry.path()) {
                Ok(record) => records.push(record),
                Err(e) => warn!(path = %entry.path().display(), error = %e, "ignoring unreadable chord record"),
            }
        }
        records.sort_by(|a, b| a.song.cmp(&b.song));
        Ok(records)
    }
}

fn is_song_output(name: &std::ffi::OsStr) -> bool {
    let name = name.to_string_lossy();
    name.ends_with(CHORDS_SUFFIX) || name.ends_with(INDEX_SUFFIX)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }
    let json = serde_json::to_vec_pretty(value)
        .with_context(|| format!("serializing {}", path.display()))?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parsing {}", path.display()))
}
