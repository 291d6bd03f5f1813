use crate::UrlError;
use url::Url;

/// Normalizes a URL to its ledger key form
///
/// The dedup ledger keys on scheme + host (+ port) + path only. CDN image
/// URLs carry signed, expiring query parameters that differ between fetches
/// of the same resource; keeping them would defeat deduplication entirely.
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Validate the scheme (http or https only)
/// 3. Drop the query string
/// 4. Drop the fragment
///
/// The path is kept byte-for-byte: the upstream CDN treats paths as opaque
/// and case-sensitive, so no case folding or dot-segment removal is applied.
///
/// # Arguments
///
/// * `url_str` - The URL string to normalize
///
/// # Returns
///
/// * `Ok(Url)` - Normalized URL
/// * `Err(UrlError)` - Failed to parse or normalize the URL
///
/// # Examples
///
/// ```
/// use ig_archiver::url::normalize_url;
///
/// let url = normalize_url("https://cdn.example.com/v/t51/img.jpg?sig=abc123&expires=99").unwrap();
/// assert_eq!(url.as_str(), "https://cdn.example.com/v/t51/img.jpg");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    url.set_query(None);
    url.set_fragment(None);

    Ok(url)
}
