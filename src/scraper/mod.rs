//! Scrape orchestration
//!
//! Two entry points share the walker: [`ProfileArchiver`] archives one
//! user's profile and timeline, [`SavedArchiver`] archives the account's
//! saved-posts feed. Both finish by draining the walker's deferred video
//! batch through the external extractor and writing `failed.txt`.

mod profile;
mod saved;
mod timeline;

pub use profile::ProfileArchiver;
pub use saved::SavedArchiver;
pub use timeline::TimelinePager;

use crate::client::VideoExtractor;
use crate::ledger::Ledger;
use crate::walker::Walker;
use crate::Result;
use std::collections::BTreeSet;
use std::path::Path;

/// Drains the deferred video batch through the extractor
///
/// Each URL is checked against the ledger first (video extraction is the
/// most expensive step, so re-runs skip it entirely) and recorded only on a
/// successful extraction. Failures land in the walker's failed set.
pub fn fetch_deferred_videos(
    walker: &mut Walker<'_>,
    ledger: &Ledger,
    extractor: &dyn VideoExtractor,
) -> Result<()> {
    while let Some(url) = walker.video_urls.pop() {
        if ledger.is_captured(&url)? {
            tracing::info!("`{}` is already saved.", url);
            continue;
        }
        if extractor.extract(&url) {
            ledger.record(&url)?;
        } else {
            walker.failed_urls.insert(url);
        }
    }
    Ok(())
}

/// Writes the failed set to `failed.txt`, one URL per line
///
/// Nothing is written when the set is empty; an existing file from an
/// earlier run is replaced so it always reflects the latest attempt.
pub fn write_failed_urls(output_dir: &Path, failed: &BTreeSet<String>) -> Result<()> {
    if failed.is_empty() {
        return Ok(());
    }
    tracing::warn!("Some video URIs failed. Check failed.txt.");
    let mut contents = String::new();
    for url in failed {
        contents.push_str(url);
        contents.push('\n');
    }
    std::fs::write(output_dir.join("failed.txt"), contents)?;
    Ok(())
}
