//! Comment aggregation
//!
//! Pages a node's comment feed via the `next_min_id` continuation token and
//! merges the pages into one logical comment set, earliest-fetched first.
//! An HTTP status failure aborts only this node's collection; exhausted
//! retries escalate to the caller because they signal an account-wide rate
//! limit.

use crate::client::{Session, SessionError, SessionResult};
use crate::model::CommentPage;

/// Collects the full comment set for a media id
///
/// Returns `Ok(None)` when the initial fetch fails with an HTTP status
/// error (logged, the node simply gets no comment file). A mid-sequence
/// status failure keeps the comments merged so far.
pub fn collect_all(session: &Session, media_id: &str) -> SessionResult<Option<CommentPage>> {
    let url = format!(
        "{}/api/v1/media/{}/comments/",
        session.web_base().as_str().trim_end_matches('/'),
        media_id
    );

    let mut merged: CommentPage = match session.get_json(
        &url,
        &[
            ("can_support_threading", "true"),
            ("permalink_enabled", "false"),
        ],
    ) {
        Ok(page) => page,
        Err(SessionError::Status { status, .. }) => {
            tracing::warn!("Failed to get comments for {} (HTTP {}).", media_id, status);
            return Ok(None);
        }
        Err(e) => return Err(e),
    };

    while merged.can_view_more_preview_comments {
        let Some(min_id) = merged.next_min_id.clone().filter(|id| !id.is_empty()) else {
            break;
        };
        let page: CommentPage = match session.get_json(
            &url,
            &[
                ("can_support_threading", "true"),
                ("min_id", min_id.as_str()),
            ],
        ) {
            Ok(page) => page,
            Err(SessionError::Status { status, .. }) => {
                tracing::warn!(
                    "Failed to get comment page for {} (HTTP {}), keeping partial set.",
                    media_id,
                    status
                );
                break;
            }
            Err(e) => return Err(e),
        };
        merge(&mut merged, page);
    }

    Ok(Some(merged))
}

/// Appends the next page's comments and advances the continuation state
fn merge(top: &mut CommentPage, next: CommentPage) {
    top.comments.extend(next.comments);
    top.can_view_more_preview_comments = next.can_view_more_preview_comments;
    top.next_min_id = next.next_min_id;
}
