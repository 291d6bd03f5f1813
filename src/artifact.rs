//! Artifact writing
//!
//! Files in the archive are write-once: once a file of a given name exists
//! it is never overwritten. This is the filesystem-level idempotence layer
//! under the dedup ledger, and it defends against a crash between a
//! successful write and the corresponding ledger commit.

use crate::{ArchiveError, Result};
use filetime::FileTime;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Writes content to a path only if that file does not already exist
///
/// The check-then-write is not atomic; the archiver is single-threaded and
/// single-process, so no other writer can race it.
///
/// # Arguments
///
/// * `path` - Destination file path
/// * `content` - Full file content (binary or text)
pub fn write_if_absent(path: &Path, content: &[u8]) -> Result<()> {
    if path.is_file() {
        tracing::debug!("File already exists, not overwriting: {}", path.display());
        return Ok(());
    }
    fs::write(path, content)?;
    Ok(())
}

/// Sets a file's access and modification time to the content's origin time
///
/// Stamping with the post's own `taken_at` timestamp lets the archive sort
/// chronologically regardless of fetch order.
///
/// # Arguments
///
/// * `path` - File to stamp
/// * `timestamp` - Unix timestamp (seconds) of the content's creation
pub fn stamp_time(path: &Path, timestamp: i64) -> Result<()> {
    let ft = FileTime::from_unix_time(timestamp, 0);
    filetime::set_file_times(path, ft, ft)?;
    Ok(())
}

/// Maps an image content type to its file extension
///
/// Only JPEG and PNG are recognized; anything else is an unknown-format
/// classification error surfaced to the caller.
pub fn extension_for(content_type: &str) -> Result<&'static str> {
    match content_type {
        "image/jpeg" => Ok("jpg"),
        "image/png" => Ok("png"),
        other => Err(ArchiveError::UnknownImageFormat(other.to_string())),
    }
}

/// Serializes a value to pretty-printed JSON with sorted keys
///
/// Round-tripping through `serde_json::Value` sorts object keys (the
/// default `Value` map is ordered), giving stable sidecar files across runs.
pub fn to_sorted_json<T: Serialize>(value: &T) -> Result<String> {
    let value = serde_json::to_value(value)?;
    Ok(serde_json::to_string_pretty(&value)?)
}
