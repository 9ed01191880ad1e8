use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::types::SongChords;

/// SQLite-backed cache of per-song extraction results.
///
/// Cache key is `(content_hash, version, fingerprint)`, where the
/// fingerprint hashes the extraction settings. Bumping the algorithm
/// version or changing any setting makes old rows unreachable.
///
/// Thread-safe via Mutex; workers only hold the lock for a single statement.
pub struct SongCache {
    connection: Mutex<Connection>,
}

impl SongCache {
    pub fn open(db_path: &Path) -> Result<Self> {
        let connection = Connection::open(db_path)
            .with_context(|| format!("opening chord cache db {}", db_path.display()))?;
        Self::init(connection)
    }

    pub fn open_in_memory() -> Result<Self> {
        let connection = Connection::open_in_memory().context("opening in-memory chord cache")?;
        Self::init(connection)
    }

    fn init(connection: Connection) -> Result<Self> {
        connection
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS song_chords (
                    content_hash TEXT NOT NULL,
                    version      INTEGER NOT NULL,
                    fingerprint  TEXT NOT NULL,
                    created_at   TEXT NOT NULL,
                    record_json  TEXT NOT NULL,
                    PRIMARY KEY (content_hash, version, fingerprint)
                );",
            )
            .context("creating cache tables")?;

        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    pub fn get(
        &self,
        content_hash: &str,
        version: u32,
        fingerprint: &str,
    ) -> Result<Option<SongChords>> {
        let conn = self
            .connection
            .lock()
            .map_err(|_| anyhow::anyhow!("cache mutex poisoned"))?;

        let mut stmt = conn.prepare_cached(
            "SELECT record_json FROM song_chords
             WHERE content_hash = ?1 AND version = ?2 AND fingerprint = ?3",
        )?;

        let result = stmt.query_row(
            rusqlite::params![content_hash, version, fingerprint],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(json) => {
                let record: SongChords =
                    serde_json::from_str(&json).context("deserializing cached chords")?;
                Ok(Some(record))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e).context("querying chord cache"),
        }
    }

    pub fn put(&self, record: &SongChords, fingerprint: &str) -> Result<()> {
        let json = serde_json::to_string(record).context("serializing chords for cache")?;
        let now = chrono::Utc::now().to_rfc3339();

        let conn = self
            .connection
            .lock()
            .map_err(|_| anyhow::anyhow!("cache mutex poisoned"))?;

        conn.execute(
            "INSERT OR REPLACE INTO song_chords
                (content_hash, version, fingerprint, created_at, record_json)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![record.content_hash, record.version, fingerprint, now, json],
        )?;

        Ok(())
    }

    /// Number of cached rows, across all versions and fingerprints.
    pub fn row_count(&self) -> Result<usize> {
        let conn = self
            .connection
            .lock()
            .map_err(|_| anyhow::anyhow!("cache mutex poisoned"))?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM song_chords", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
