//! External video extractor boundary
//!
//! Video retrieval is delegated to yt-dlp, invoked once per deferred URL
//! after the metadata/image pass completes. Only the success/failure of the
//! invocation matters here; the extractor's own output layout is its
//! business.

use std::path::{Path, PathBuf};
use std::process::Command;

/// Interface to the external media extractor
pub trait VideoExtractor {
    /// Attempts to extract the media behind a public URL
    ///
    /// Returns whether extraction succeeded; failures are collected by the
    /// caller, never retried here.
    fn extract(&self, url: &str) -> bool;
}

/// yt-dlp subprocess extractor
pub struct YtDlpExtractor {
    program: PathBuf,
    output_dir: PathBuf,
}

impl YtDlpExtractor {
    pub fn new(output_dir: &Path) -> Self {
        Self {
            program: PathBuf::from("yt-dlp"),
            output_dir: output_dir.to_path_buf(),
        }
    }

    /// Overrides the invoked program (used by tests)
    pub fn with_program(program: PathBuf, output_dir: &Path) -> Self {
        Self {
            program,
            output_dir: output_dir.to_path_buf(),
        }
    }
}

impl VideoExtractor for YtDlpExtractor {
    fn extract(&self, url: &str) -> bool {
        tracing::info!("Extracting `{}`.", url);
        match Command::new(&self.program)
            .arg("--no-progress")
            .arg(url)
            .current_dir(&self.output_dir)
            .status()
        {
            Ok(status) if status.success() => true,
            Ok(status) => {
                tracing::warn!("Extractor exited with {} for `{}`.", status, url);
                false
            }
            Err(e) => {
                tracing::warn!("Failed to launch extractor for `{}`: {}", url, e);
                false
            }
        }
    }
}
