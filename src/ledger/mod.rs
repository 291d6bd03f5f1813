//! The dedup ledger
//!
//! A small persisted key-set recording which remote resource URLs have
//! already been fully captured. It is the only source of truth for
//! idempotence across runs: a recorded URL is guaranteed to have its
//! artifact on disk, because callers record only after a successful write.
//!
//! The ledger commits per record, never in batches, so an interrupt at any
//! point loses at most the one in-flight fetch.

mod schema;

pub use schema::LOG_SCHEMA;

use crate::url::normalize_url;
use crate::Result;
use rusqlite::{params, Connection};
use std::path::Path;

/// Durable set of already-archived resource URLs
///
/// URLs are normalized (query string and fragment stripped) before both
/// lookup and insert, so signed/expiring CDN parameters do not defeat dedup.
pub struct Ledger {
    /// `None` when the ledger is disabled (`--no-log`): every lookup then
    /// reports "not captured" and every record is a no-op.
    conn: Option<Connection>,
}

impl Ledger {
    /// Opens (or creates) the ledger database at the given path
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite ledger file
    ///
    /// # Returns
    ///
    /// * `Ok(Ledger)` - Successfully opened/created ledger
    /// * `Err(ArchiveError)` - Failed to open or initialize the database
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::initialize_schema(&conn)?;
        Ok(Self { conn: Some(conn) })
    }

    /// Creates a disabled ledger that forces re-fetch of everything
    pub fn disabled() -> Self {
        Self { conn: None }
    }

    /// Creates an in-memory ledger (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize_schema(&conn)?;
        Ok(Self { conn: Some(conn) })
    }

    /// Returns whether a URL has already been captured
    ///
    /// Storage errors are fatal: a misread here risks silent re-download
    /// storms or silently skipped content on the next run.
    pub fn is_captured(&self, url: &str) -> Result<bool> {
        let Some(conn) = &self.conn else {
            return Ok(false);
        };
        let key = normalize_url(url)?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(url) FROM log WHERE url = ?1",
            params![key.as_str()],
            |row| row.get(0),
        )?;
        Ok(count == 1)
    }

    /// Records a URL as captured
    ///
    /// Insert-or-ignore semantics: recording the same normalized URL twice
    /// neither errors nor duplicates the row. The insert commits immediately
    /// (autocommit), so the record is durable before this returns.
    pub fn record(&self, url: &str) -> Result<()> {
        let Some(conn) = &self.conn else {
            return Ok(());
        };
        let key = normalize_url(url)?;
        conn.execute(
            "INSERT OR IGNORE INTO log (url) VALUES (?1)",
            params![key.as_str()],
        )?;
        Ok(())
    }
}
