//! Blocking HTTP session
//!
//! All requests in a session are issued serially from one thread; against a
//! rate-limited private API this is itself the admission-control mechanism,
//! so there is no concurrent request machinery here. The session handles:
//! - Shared and API headers, including the CSRF token from the cookies
//! - Retry with exponential backoff on 413/429/5xx and connect/timeout errors
//! - GET (text/JSON/bytes), HEAD probes, and GraphQL POST queries

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Browser user agent presented to the API
pub const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                              (KHTML, like Gecko) Chrome/137.0.0.0 Safari/537.36";

/// GraphQL document id of the user-timeline query
pub const GRAPHQL_DOC_ID: &str = "9806959572732215";

/// Statuses that are retried before giving up
const STATUS_FORCELIST: &[u16] = &[413, 429, 500, 502, 503, 504];

const MAX_ATTEMPTS: u32 = 4;
const INITIAL_BACKOFF: Duration = Duration::from_millis(500);

/// Transport-layer errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Retries exhausted for {url}")]
    RetriesExhausted { url: String },

    #[error("Network error for {url}: {source}")]
    Transport { url: String, source: reqwest::Error },

    #[error("Failed to decode response from {url}: {source}")]
    Decode { url: String, source: reqwest::Error },

    #[error("Failed to parse payload from {url}: {source}")]
    Payload {
        url: String,
        source: serde_json::Error,
    },
}

/// Result type alias for transport operations
pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Base URLs of the web and API hosts
///
/// Overridable so tests can point a session at a local mock server.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub web: Url,
    pub api: Url,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            web: Url::parse("https://www.instagram.com").expect("static URL"),
            api: Url::parse("https://i.instagram.com").expect("static URL"),
        }
    }
}

/// Result of a HEAD existence probe
#[derive(Debug)]
pub struct HeadProbe {
    pub status: u16,
    pub content_type: Option<String>,
    /// URL after following any redirect; this is the dedup key for images
    pub final_url: String,
}

/// A blocking HTTP session scoped to one archival run
pub struct Session {
    client: Client,
    endpoints: Endpoints,
    csrf_token: Option<String>,
}

impl Session {
    /// Creates a session against the production endpoints
    ///
    /// # Arguments
    ///
    /// * `cookie_header` - Raw `Cookie` header value carrying the logged-in
    ///   session (browser-profile extraction happens outside this tool)
    pub fn new(cookie_header: Option<&str>) -> SessionResult<Self> {
        Self::with_endpoints(cookie_header, Endpoints::default())
    }

    /// Creates a session against explicit endpoints (used by tests)
    pub fn with_endpoints(
        cookie_header: Option<&str>,
        endpoints: Endpoints,
    ) -> SessionResult<Self> {
        let csrf_token = cookie_header.and_then(extract_csrf_token);
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(build_headers(cookie_header, csrf_token.as_deref()))
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            endpoints,
            csrf_token,
        })
    }

    /// Base URL of the web host (`www.instagram.com` in production)
    pub fn web_base(&self) -> &Url {
        &self.endpoints.web
    }

    /// Base URL of the API host (`i.instagram.com` in production)
    pub fn api_base(&self) -> &Url {
        &self.endpoints.api
    }

    /// Whether the configured cookies carried a CSRF token
    ///
    /// The token is required for authenticated API calls; the archiver
    /// refuses to start a scrape without one.
    pub fn has_csrf_token(&self) -> bool {
        self.csrf_token.is_some()
    }

    /// Issues a request with retry on transient failures
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | HTTP 413/429/5xx | Retry up to 3 times, exponential backoff |
    /// | Timeout / connect error | Retry up to 3 times, exponential backoff |
    /// | Any other transport error | Immediate error |
    /// | Any other status | Returned to the caller unchanged |
    fn execute<F>(&self, build: F, url: &str) -> SessionResult<Response>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let mut backoff = INITIAL_BACKOFF;
        for attempt in 1..=MAX_ATTEMPTS {
            match build(&self.client).send() {
                Ok(resp) if STATUS_FORCELIST.contains(&resp.status().as_u16()) => {
                    tracing::warn!(
                        "HTTP {} for {} (attempt {}/{})",
                        resp.status(),
                        url,
                        attempt,
                        MAX_ATTEMPTS
                    );
                }
                Ok(resp) => return Ok(resp),
                Err(e) if e.is_timeout() || e.is_connect() => {
                    tracing::warn!(
                        "Network error for {} (attempt {}/{}): {}",
                        url,
                        attempt,
                        MAX_ATTEMPTS,
                        e
                    );
                }
                Err(e) => {
                    return Err(SessionError::Transport {
                        url: url.to_string(),
                        source: e,
                    })
                }
            }
            if attempt < MAX_ATTEMPTS {
                std::thread::sleep(backoff);
                backoff *= 2;
            }
        }
        Err(SessionError::RetriesExhausted {
            url: url.to_string(),
        })
    }

    /// GETs a URL and returns the raw response without status checking
    ///
    /// Used where the caller needs to inspect status and redirects itself
    /// (the media-info fetch treats them as distinct failure classes).
    pub fn get_response(&self, url: &str, params: &[(&str, &str)]) -> SessionResult<Response> {
        self.execute(|c| c.get(url).query(params), url)
    }

    /// GETs a URL as text; non-2xx is an error
    pub fn get_text(&self, url: &str) -> SessionResult<String> {
        let resp = self.execute(|c| c.get(url), url)?;
        let resp = check_status(resp, url)?;
        resp.text().map_err(|e| SessionError::Decode {
            url: url.to_string(),
            source: e,
        })
    }

    /// GETs a URL as JSON; non-2xx is an error
    pub fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> SessionResult<T> {
        let resp = self.execute(|c| c.get(url).query(params), url)?;
        let resp = check_status(resp, url)?;
        resp.json().map_err(|e| SessionError::Decode {
            url: url.to_string(),
            source: e,
        })
    }

    /// GETs a URL as raw bytes; non-2xx is an error
    pub fn get_bytes(&self, url: &str) -> SessionResult<Vec<u8>> {
        let resp = self.execute(|c| c.get(url), url)?;
        let resp = check_status(resp, url)?;
        let bytes = resp.bytes().map_err(|e| SessionError::Decode {
            url: url.to_string(),
            source: e,
        })?;
        Ok(bytes.to_vec())
    }

    /// Sends a HEAD probe, following redirects
    ///
    /// Returns status, content type, and the redirect-resolved URL without
    /// downloading the body.
    pub fn head(&self, url: &str) -> SessionResult<HeadProbe> {
        let resp = self.execute(|c| c.head(url), url)?;
        let content_type = resp
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string());
        Ok(HeadProbe {
            status: resp.status().as_u16(),
            content_type,
            final_url: resp.url().to_string(),
        })
    }

    /// POSTs a form to a URL, ignoring the response body
    pub fn post_form(&self, url: &str) -> SessionResult<()> {
        let resp = self.execute(|c| c.post(url), url)?;
        check_status(resp, url)?;
        Ok(())
    }

    /// Makes a GraphQL query against the web host
    ///
    /// Returns `Ok(None)` when the server answers with a non-200 status or a
    /// malformed envelope (`status != "ok"` or missing `data`); callers treat
    /// that as "no further results". Transport failures surface as errors.
    pub fn post_graphql<T: DeserializeOwned>(&self, variables: &Value) -> SessionResult<Option<T>> {
        let url = format!(
            "{}/graphql/query",
            self.endpoints.web.as_str().trim_end_matches('/')
        );
        let variables_json =
            serde_json::to_string(variables).map_err(|e| SessionError::Payload {
                url: url.clone(),
                source: e,
            })?;
        let form = [("doc_id", GRAPHQL_DOC_ID), ("variables", &variables_json)];

        let resp = self.execute(|c| c.post(&url).form(&form), &url)?;
        if resp.status().as_u16() != 200 {
            tracing::debug!("GraphQL query returned HTTP {}", resp.status());
            return Ok(None);
        }
        let envelope: Value = resp.json().map_err(|e| SessionError::Decode {
            url: url.clone(),
            source: e,
        })?;

        let status = envelope.get("status").and_then(Value::as_str);
        if status != Some("ok") {
            tracing::error!("GraphQL status not \"ok\": {:?}", status);
            return Ok(None);
        }
        if envelope
            .get("errors")
            .map(|e| !e.is_null())
            .unwrap_or(false)
        {
            tracing::warn!("GraphQL response has errors.");
            tracing::debug!("Response: {}", envelope);
        }
        let Some(data) = envelope.get("data").filter(|d| !d.is_null()) else {
            tracing::error!("No data in GraphQL response.");
            return Ok(None);
        };

        serde_json::from_value(data.clone())
            .map(Some)
            .map_err(|e| SessionError::Payload { url, source: e })
    }
}

/// Maps a non-2xx response to a Status error
fn check_status(resp: Response, url: &str) -> SessionResult<Response> {
    let status = resp.status();
    if !status.is_success() {
        return Err(SessionError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    Ok(resp)
}

/// Builds the shared default header set
fn build_headers(cookie_header: Option<&str>, csrf_token: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("accept", HeaderValue::from_static("*/*"));
    headers.insert("cache-control", HeaderValue::from_static("no-cache"));
    headers.insert("dnt", HeaderValue::from_static("1"));
    headers.insert("pragma", HeaderValue::from_static("no-cache"));
    headers.insert("x-asbd-id", HeaderValue::from_static("359341"));
    headers.insert("x-ig-app-id", HeaderValue::from_static("936619743392459"));
    if let Some(cookie) = cookie_header {
        if let Ok(value) = HeaderValue::from_str(cookie) {
            headers.insert("cookie", value);
        }
    }
    if let Some(token) = csrf_token {
        if let Ok(value) = HeaderValue::from_str(token) {
            headers.insert("x-csrftoken", value);
        }
    }
    headers
}

/// Pulls the `csrftoken` value out of a raw Cookie header string
fn extract_csrf_token(cookie_header: &str) -> Option<String> {
    cookie_header.split(';').find_map(|pair| {
        let (name, value) = pair.split_once('=')?;
        if name.trim() == "csrftoken" && !value.trim().is_empty() {
            Some(value.trim().to_string())
        } else {
            None
        }
    })
}
