//! Session configuration
//!
//! One archival session covers one user profile (or one saved-posts
//! collection) and owns its output directory and ledger exclusively.

use std::path::PathBuf;

/// Configuration for a single archival session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Directory the artifacts are written into; created if missing
    pub output_dir: PathBuf,

    /// Ledger database path; defaults to `.log.db` inside the output dir
    pub ledger_path: Option<PathBuf>,

    /// Disable the ledger entirely, forcing a re-fetch of everything
    pub disable_ledger: bool,

    /// Whether to also collect comment threads for each post
    pub save_comments: bool,
}

impl SessionConfig {
    /// Creates a config with the default ledger location inside `output_dir`
    pub fn new(output_dir: PathBuf) -> Self {
        Self {
            output_dir,
            ledger_path: None,
            disable_ledger: false,
            save_comments: false,
        }
    }

    /// Resolves the effective ledger database path
    pub fn ledger_path(&self) -> PathBuf {
        self.ledger_path
            .clone()
            .unwrap_or_else(|| self.output_dir.join(".log.db"))
    }
}
