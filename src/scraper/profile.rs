//! Profile archival
//!
//! The full sequence for one username:
//! 1. Load the public profile page (establishes server-side session state)
//! 2. Verify the cookies carried a CSRF token; refuse to continue without
//! 3. Fetch and persist `web_profile_info.json`
//! 4. Capture the profile picture, ledger-gated by its URL
//! 5. Queue story highlights for the deferred video batch
//! 6. Walk the timeline edges embedded in the profile document
//! 7. Page through the rest of the timeline via GraphQL, walking each page
//! 8. Drain the deferred video batch and write `failed.txt`

use crate::client::{Session, SessionError, VideoExtractor};
use crate::config::SessionConfig;
use crate::ledger::Ledger;
use crate::model::{HighlightsTray, UserInfo, WebProfileInfo};
use crate::scraper::{fetch_deferred_videos, write_failed_urls, TimelinePager};
use crate::url::highlight_url;
use crate::walker::Walker;
use crate::{artifact, ArchiveError, Result};
use serde_json::Value;
use std::fs;

/// Archives a single user's profile, timeline, and highlights
pub struct ProfileArchiver<'a> {
    session: &'a Session,
    ledger: &'a Ledger,
    config: &'a SessionConfig,
    extractor: &'a dyn VideoExtractor,
    username: &'a str,
}

impl<'a> ProfileArchiver<'a> {
    pub fn new(
        session: &'a Session,
        ledger: &'a Ledger,
        config: &'a SessionConfig,
        extractor: &'a dyn VideoExtractor,
        username: &'a str,
    ) -> Self {
        Self {
            session,
            ledger,
            config,
            extractor,
            username,
        }
    }

    /// Runs the full archival sequence for the configured username
    pub fn process(&self) -> Result<()> {
        let web = self.session.web_base().as_str().trim_end_matches('/');
        let api = self.session.api_base().as_str().trim_end_matches('/');

        // Hitting the profile page first makes the API endpoints accept the
        // session; requests that skip it get redirected to the login wall.
        self.session
            .get_text(&format!("{}/{}/", web, self.username))?;
        if !self.session.has_csrf_token() {
            return Err(ArchiveError::CsrfTokenNotFound);
        }

        let info_url = format!("{}/api/v1/users/web_profile_info/", api);
        let raw: Value = self
            .session
            .get_json(&info_url, &[("username", self.username)])?;
        // Refreshed every run; follower counts and bio change over time
        fs::write(
            self.config.output_dir.join("web_profile_info.json"),
            artifact::to_sorted_json(&raw)?,
        )?;
        let info: WebProfileInfo =
            serde_json::from_value(raw).map_err(|e| SessionError::Payload {
                url: info_url,
                source: e,
            })?;
        let user = info.data.user;

        self.save_profile_pic(&user)?;

        let mut walker = Walker::new(
            self.session,
            self.ledger,
            &self.config.output_dir,
            self.config.save_comments,
        );
        self.queue_highlights(&user, &mut walker)?;

        walker.walk(&user.edge_owner_to_timeline_media.edges, None)?;

        let mut pager = TimelinePager::new(self.session, self.username);
        while let Some(edges) = pager.next_page()? {
            walker.walk(&edges, None)?;
        }

        fetch_deferred_videos(&mut walker, self.ledger, self.extractor)?;
        write_failed_urls(&self.config.output_dir, &walker.failed_urls)?;
        Ok(())
    }

    /// Captures `profile_pic.jpg`, gated by the rendition URL
    fn save_profile_pic(&self, user: &UserInfo) -> Result<()> {
        if self.ledger.is_captured(&user.profile_pic_url_hd)? {
            return Ok(());
        }
        let bytes = self.session.get_bytes(&user.profile_pic_url_hd)?;
        fs::write(self.config.output_dir.join("profile_pic.jpg"), bytes)?;
        self.ledger.record(&user.profile_pic_url_hd)?;
        Ok(())
    }

    /// Queues the user's story highlights as deferred video URLs
    ///
    /// Highlights are optional content; an HTTP failure here is logged and
    /// the scrape continues without them.
    fn queue_highlights(&self, user: &UserInfo, walker: &mut Walker<'_>) -> Result<()> {
        let Some(user_id) = user.id.as_deref() else {
            return Ok(());
        };
        let url = format!(
            "{}/api/v1/highlights/{}/highlights_tray/",
            self.session.api_base().as_str().trim_end_matches('/'),
            user_id
        );
        let tray: HighlightsTray = match self.session.get_json(&url, &[]) {
            Ok(tray) => tray,
            Err(SessionError::Status { status, .. }) => {
                tracing::warn!("Failed to get highlights data (HTTP {}).", status);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        for item in tray.tray {
            walker.add_video_url(highlight_url(self.session.web_base(), &item.id));
        }
        Ok(())
    }
}
