//! Ig-Archiver: an incremental Instagram profile archiver
//!
//! This crate archives an account's public content (posts, carousels,
//! stories/highlights, comments) by walking the paginated timeline graph,
//! deduplicating against a durable URL ledger, and deferring video retrieval
//! to an external extractor.

pub mod artifact;
pub mod client;
pub mod config;
pub mod ledger;
pub mod model;
pub mod scraper;
pub mod url;
pub mod walker;

use thiserror::Error;

/// Main error type for archiver operations
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Transport error: {0}")]
    Session(#[from] client::SessionError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("CSRF token not found in session cookies")]
    CsrfTokenNotFound,

    #[error("Unexpected redirect fetching {url}")]
    UnexpectedRedirect { url: String },

    #[error("Unknown image content type: {0}")]
    UnknownImageFormat(String),

    #[error("Media info at {url} reports more results than the single-item model allows")]
    MoreResultsAvailable { url: String },
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for archiver operations
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use client::{Session, SessionError, VideoExtractor, YtDlpExtractor};
pub use config::SessionConfig;
pub use ledger::Ledger;
pub use model::{Edge, MediaNode, PageInfo};
pub use scraper::{ProfileArchiver, SavedArchiver};
pub use url::normalize_url;
pub use walker::{classify, select_best, NodeKind, Walker};
