//! HTTP session and external-extractor collaborators
//!
//! This module contains the thin integration layer under the archival core:
//! - A blocking HTTP session with cookie/CSRF headers and retry on
//!   rate-limit/server-error statuses
//! - The subprocess boundary to the external video extractor

mod extractor;
mod session;

pub use extractor::{VideoExtractor, YtDlpExtractor};
pub use session::{Endpoints, HeadProbe, Session, SessionError, SessionResult};
