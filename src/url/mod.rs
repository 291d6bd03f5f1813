//! URL handling for the archiver
//!
//! This module owns the two URL concerns of the archiver:
//! - Ledger-key normalization (stripping signed query parameters)
//! - Building the canonical public URLs handed to the video extractor

mod normalize;

pub use normalize::normalize_url;

use url::Url;

/// Builds the canonical public post URL for a shortcode
///
/// This is the user-facing `/p/{shortcode}/` form, which is what the
/// external video extractor accepts.
pub fn post_url(web_base: &Url, shortcode: &str) -> String {
    format!(
        "{}/p/{}/",
        web_base.as_str().trim_end_matches('/'),
        shortcode
    )
}

/// Builds the public stories-highlight URL for a highlights-tray item
///
/// Tray item identifiers arrive in the form `highlight:12345`; only the
/// trailing numeric segment appears in the public URL.
pub fn highlight_url(web_base: &Url, tray_item_id: &str) -> String {
    let id = tray_item_id.rsplit(':').next().unwrap_or(tray_item_id);
    format!(
        "{}/stories/highlights/{}/",
        web_base.as_str().trim_end_matches('/'),
        id
    )
}
