//! SQLite cache of downloaded and isolated audio
//!
//! Maps a source identity to the file produced for it, so repeated runs skip
//! downloads and drum separation.

use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during cache operations
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Kind of file stored for a source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Audio fetched from a remote source
    Download,
    /// Isolated drum track
    DrumStem,
}

impl ArtifactKind {
    fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::Download => "download",
            ArtifactKind::DrumStem => "drum_stem",
        }
    }
}

/// Lookup interface keyed by source identity
pub trait ArtifactStore {
    /// Path recorded for `key`, if any and if the file still exists
    fn lookup(&self, key: &str, kind: ArtifactKind) -> Option<PathBuf>;

    /// Record `path` for `key`, replacing any previous entry
    fn record(&self, key: &str, kind: ArtifactKind, path: &Path) -> Result<(), CacheError>;
}

/// Artifact cache backed by SQLite
pub struct SqliteArtifactCache {
    conn: Connection,
}

impl SqliteArtifactCache {
    const SCHEMA: &'static str = r#"
        CREATE TABLE IF NOT EXISTS artifacts (
            source TEXT NOT NULL,
            kind TEXT NOT NULL,
            path TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            PRIMARY KEY (source, kind)
        );
    "#;

    /// Open or create a cache database at the given path
    pub fn open(db_path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)?;
        conn.execute_batch(Self::SCHEMA)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database
    pub fn in_memory() -> Result<Self, CacheError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(Self::SCHEMA)?;
        Ok(Self { conn })
    }

    /// Default database location
    pub fn default_path() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("blastbeat")
            .join("artifacts.db")
    }

    /// Number of entries
    pub fn count(&self) -> Result<usize, CacheError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM artifacts", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Remove every entry for a source
    pub fn remove(&self, key: &str) -> Result<bool, CacheError> {
        let affected = self
            .conn
            .execute("DELETE FROM artifacts WHERE source = ?1", [key])?;
        Ok(affected > 0)
    }

    /// Clear all cached entries
    pub fn clear(&self) -> Result<(), CacheError> {
        self.conn.execute("DELETE FROM artifacts", [])?;
        Ok(())
    }
}

impl ArtifactStore for SqliteArtifactCache {
    fn lookup(&self, key: &str, kind: ArtifactKind) -> Option<PathBuf> {
        let path: String = self
            .conn
            .query_row(
                "SELECT path FROM artifacts WHERE source = ?1 AND kind = ?2",
                params![key, kind.as_str()],
                |row| row.get(0),
            )
            .ok()?;
        let path = PathBuf::from(path);
        path.exists().then_some(path)
    }

    fn record(&self, key: &str, kind: ArtifactKind, path: &Path) -> Result<(), CacheError> {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        self.conn.execute(
            r#"INSERT OR REPLACE INTO artifacts (source, kind, path, created_at)
               VALUES (?1, ?2, ?3, ?4)"#,
            params![key, kind.as_str(), path.to_string_lossy().to_string(), now],
        )?;
        Ok(())
    }
}
