//! Timeline pagination
//!
//! The user timeline is a cursor-paged GraphQL connection. The first query
//! carries no cursor; each follow-up passes the previous page's `end_cursor`
//! as `after`. The variable shapes differ between the two and the server
//! rejects mismatches, so they are built separately here.

use crate::client::{Session, SessionResult};
use crate::model::{Edge, TimelineResponse};
use serde_json::{json, Value};

/// Requested page size
const PAGE_SIZE: u32 = 12;

/// Cursor-driven iterator over a user's timeline pages
pub struct TimelinePager<'a> {
    session: &'a Session,
    username: &'a str,
    cursor: Option<String>,
    has_next: bool,
    started: bool,
}

impl<'a> TimelinePager<'a> {
    pub fn new(session: &'a Session, username: &'a str) -> Self {
        Self {
            session,
            username,
            cursor: None,
            has_next: true,
            started: false,
        }
    }

    fn first_page_variables(&self) -> Value {
        json!({
            "data": {
                "count": PAGE_SIZE,
                "include_reel_media_seen_timestamp": true,
                "include_relationship_info": true,
                "latest_besties_reel_media": true,
                "latest_reel_media": true
            },
            "username": self.username,
            "__relay_internal__pv__PolarisIsLoggedInrelayprovider": true,
            "__relay_internal__pv__PolarisShareSheetV3relayprovider": true
        })
    }

    fn continuation_variables(&self) -> Value {
        json!({
            "after": self.cursor,
            "before": null,
            "data": {
                "count": PAGE_SIZE,
                "include_reel_media_seen_timestamp": true,
                "include_relationship_info": true,
                "latest_besties_reel_media": true,
                "latest_reel_media": true
            },
            "first": PAGE_SIZE,
            "last": null,
            "username": self.username,
            "__relay_internal__pv__PolarisIsLoggedInrelayprovider": true,
            "__relay_internal__pv__PolarisShareSheetV3relayprovider": true
        })
    }

    /// Fetches the next page of timeline edges
    ///
    /// Returns `Ok(None)` when the timeline is exhausted, and also when the
    /// server answers a query with a malformed envelope (mid-scrape that
    /// simply ends pagination; on the first page it is logged as an error
    /// since it means the whole timeline was skipped).
    pub fn next_page(&mut self) -> SessionResult<Option<Vec<Edge>>> {
        if self.started && !self.has_next {
            return Ok(None);
        }
        let variables = if self.started {
            self.continuation_variables()
        } else {
            self.first_page_variables()
        };

        let response: Option<TimelineResponse> = self.session.post_graphql(&variables)?;
        let Some(response) = response else {
            if !self.started {
                tracing::error!("First GraphQL query failed.");
            }
            self.has_next = false;
            self.started = true;
            return Ok(None);
        };

        let connection = response.xdt_api__v1__feed__user_timeline_graphql_connection;
        self.has_next = connection.page_info.has_next_page;
        self.cursor = connection.page_info.end_cursor;
        self.started = true;
        Ok(Some(connection.edges))
    }
}
