//! Edge traversal and capture
//!
//! This module contains the core archival logic:
//! - Classifying content nodes and recursing into carousel children
//! - Coarse dedup by media-info URL, fine dedup by rendition URL
//! - Writing sidecar JSON and image artifacts, stamped with origin time
//! - Accumulating deferred video URLs and failed items without aborting
//!
//! Edges are processed strictly in server order with no parallelism: later
//! edges may collide with earlier identifiers, so idempotence depends on
//! the ledger being current at check time.

mod classify;
mod comments;
mod renditions;

pub use classify::{classify, NodeKind, MEDIA_TYPENAME};
pub use comments::collect_all;
pub use renditions::select_best;

use crate::artifact;
use crate::client::{Session, SessionError};
use crate::ledger::Ledger;
use crate::model::{Edge, ImageVersions, MediaInfo};
use crate::url::post_url;
use crate::{ArchiveError, Result};
use std::collections::BTreeSet;
use std::path::Path;

/// Decides whether an error aborts the whole walk
///
/// Transport exhaustion signals an account-wide rate limit; storage errors
/// risk corrupting the "already archived" record. Everything else is
/// localized to the edge or rendition that produced it.
fn is_fatal(error: &ArchiveError) -> bool {
    matches!(
        error,
        ArchiveError::Session(SessionError::RetriesExhausted { .. })
            | ArchiveError::Session(SessionError::Transport { .. })
            | ArchiveError::Session(SessionError::Client(_))
            | ArchiveError::Session(SessionError::Decode { .. })
            | ArchiveError::Database(_)
            | ArchiveError::Io(_)
            | ArchiveError::Json(_)
            | ArchiveError::UnexpectedRedirect { .. }
            | ArchiveError::CsrfTokenNotFound
    )
}

/// Recursive processor for a collection of content edges
///
/// One walker instance owns the deferred-video and failed-item sets for a
/// session's lifetime; both are drained by the scraper after the walk.
pub struct Walker<'a> {
    session: &'a Session,
    ledger: &'a Ledger,
    output_dir: &'a Path,
    save_comments: bool,
    /// Canonical post URLs queued for the external video extractor
    pub video_urls: Vec<String>,
    /// Items needing human follow-up, written to `failed.txt`
    pub failed_urls: BTreeSet<String>,
}

impl<'a> Walker<'a> {
    pub fn new(
        session: &'a Session,
        ledger: &'a Ledger,
        output_dir: &'a Path,
        save_comments: bool,
    ) -> Self {
        Self {
            session,
            ledger,
            output_dir,
            save_comments,
            video_urls: Vec::new(),
            failed_urls: BTreeSet::new(),
        }
    }

    /// Queues a video URL for the deferred extraction batch
    pub fn add_video_url(&mut self, url: String) {
        tracing::info!("Added video URL: {}", url);
        self.video_urls.push(url);
    }

    /// Processes a collection of edges, recursing into carousel children
    ///
    /// Per-edge failures are logged and recorded in the failed set; the walk
    /// continues with the next sibling. Only errors classified fatal by
    /// [`is_fatal`] propagate and abort the remaining walk.
    pub fn walk(&mut self, edges: &[Edge], parent: Option<&Edge>) -> Result<()> {
        for edge in edges {
            match classify(&edge.node) {
                NodeKind::Video => self.defer_video(edge, parent),
                NodeKind::Unknown => self.route_unknown(edge),
                NodeKind::Carousel => {
                    if parent.is_some() {
                        // Carousels nest one level only; anything deeper is
                        // upstream schema drift we refuse to guess at.
                        tracing::warn!(
                            "Nested carousel {:?}; flagging as unknown.",
                            edge.node.id
                        );
                        self.route_unknown(edge);
                        continue;
                    }
                    if self.save_comments {
                        let result = self.save_comments_for(edge);
                        self.isolate(edge, result)?;
                    }
                    let children: Vec<Edge> = edge
                        .node
                        .carousel_media
                        .clone()
                        .unwrap_or_default()
                        .into_iter()
                        .map(|node| Edge { node })
                        .collect();
                    self.walk(&children, Some(edge))?;
                }
                NodeKind::Image => {
                    let result = self.capture_post(edge, parent.is_none());
                    self.isolate(edge, result)?;
                }
            }
        }
        Ok(())
    }

    /// Applies the failure-isolation policy to one edge's result
    fn isolate(&mut self, edge: &Edge, result: Result<()>) -> Result<()> {
        match result {
            Ok(()) => Ok(()),
            Err(e) if is_fatal(&e) => {
                tracing::error!("Aborting walk: {}", e);
                Err(e)
            }
            Err(e) => {
                tracing::error!("Skipping media {:?}: {}", edge.node.id, e);
                self.flag_edge(edge);
                Ok(())
            }
        }
    }

    /// Records an edge in the failed set, preferring its public URL
    fn flag_edge(&mut self, edge: &Edge) {
        if let Some(code) = &edge.node.code {
            self.failed_urls
                .insert(post_url(self.session.web_base(), code));
        } else if let Some(id) = &edge.node.id {
            self.failed_urls.insert(id.clone());
        }
    }

    /// Derives the canonical post URL and queues it for deferred extraction
    ///
    /// A node missing its own shortcode inherits the parent edge's (carousel
    /// children share the parent post's public URL). With neither available
    /// the edge is flagged and skipped; a shortcode is never guessed.
    fn defer_video(&mut self, edge: &Edge, parent: Option<&Edge>) {
        let code = edge
            .node
            .code
            .as_deref()
            .or_else(|| parent.and_then(|p| p.node.code.as_deref()));
        match code {
            Some(code) => {
                let url = post_url(self.session.web_base(), code);
                self.add_video_url(url);
            }
            None => {
                tracing::error!("Unknown shortcode for media {:?}.", edge.node.id);
                if let Some(id) = &edge.node.id {
                    self.failed_urls.insert(id.clone());
                }
            }
        }
    }

    /// Routes an unrecognized node to the failed set for human follow-up
    fn route_unknown(&mut self, edge: &Edge) {
        tracing::warn!(
            "Unknown type: `{}`. Item {} will not be processed.",
            edge.node.typename.as_deref().unwrap_or("<missing>"),
            edge.node.id.as_deref().unwrap_or("<no id>")
        );
        self.flag_edge(edge);
    }

    /// Captures one post: comment thread (top-level only), then media
    fn capture_post(&mut self, edge: &Edge, top_level: bool) -> Result<()> {
        if self.save_comments && top_level {
            self.save_comments_for(edge)?;
        }
        self.save_media(edge)
    }

    /// Collects and persists the comment thread for an edge's node
    fn save_comments_for(&mut self, edge: &Edge) -> Result<()> {
        let Some(id) = edge.node.id.as_deref() else {
            return Ok(());
        };
        if edge.node.comment_count == Some(0) {
            return Ok(());
        }
        let Some(data) = comments::collect_all(self.session, id)? else {
            return Ok(());
        };
        let path = self.output_dir.join(format!("{id}-comments.json"));
        artifact::write_if_absent(&path, artifact::to_sorted_json(&data)?.as_bytes())?;
        Ok(())
    }

    /// Captures a post's metadata document and all its image renditions
    ///
    /// Dedup here is per-post (the media-info URL), deliberately coarser
    /// than the per-rendition check below: the metadata document and its
    /// images are captured together as one unit, so a ledger hit skips the
    /// whole post without re-deriving sub-artifacts.
    fn save_media(&mut self, edge: &Edge) -> Result<()> {
        let Some(pk) = edge.node.pk.as_deref() else {
            tracing::warn!("Media node {:?} has no pk; skipping media fetch.", edge.node.id);
            return Ok(());
        };
        let media_info_url = format!(
            "{}/api/v1/media/{}/info/",
            self.session.web_base().as_str().trim_end_matches('/'),
            pk
        );
        tracing::info!("Saving media at URL: {}", media_info_url);
        if self.ledger.is_captured(&media_info_url)? {
            return Ok(());
        }

        let resp = self.session.get_response(&media_info_url, &[])?;
        if resp.url().as_str() != media_info_url {
            // A redirect here means the login wall; nothing further will work
            return Err(ArchiveError::UnexpectedRedirect {
                url: media_info_url,
            });
        }
        let status = resp.status().as_u16();
        if status != 200 {
            tracing::warn!("GET request failed with status code {}.", status);
            if let Ok(body) = resp.text() {
                tracing::debug!("Content: {}", body);
            }
            return Ok(());
        }
        let body = resp.text().map_err(|e| SessionError::Decode {
            url: media_info_url.clone(),
            source: e,
        })?;
        if !body.contains("image_versions2") || !body.contains("taken_at") {
            tracing::warn!("Invalid response. image_versions2 dict not found.");
            return Ok(());
        }
        let media_info: MediaInfo =
            serde_json::from_str(&body).map_err(|e| SessionError::Payload {
                url: media_info_url.clone(),
                source: e,
            })?;
        if media_info.more_available {
            // The endpoint was asked for exactly one result set
            tracing::error!("Media info payload: {}", body);
            return Err(ArchiveError::MoreResultsAvailable {
                url: media_info_url,
            });
        }
        let Some(first_item) = media_info.items.first() else {
            tracing::warn!("Media info at {} has no items.", media_info_url);
            return Ok(());
        };
        let timestamp = first_item.taken_at;

        let Some(id) = edge.node.id.as_deref() else {
            tracing::warn!("Media node with pk {} has no id; skipping.", pk);
            return Ok(());
        };
        let node_path = self.output_dir.join(format!("{id}.json"));
        let info_path = self.output_dir.join(format!("{id}-media-info-0000.json"));
        artifact::write_if_absent(&node_path, artifact::to_sorted_json(&edge.node)?.as_bytes())?;
        artifact::write_if_absent(&info_path, artifact::to_sorted_json(&media_info)?.as_bytes())?;
        artifact::stamp_time(&node_path, timestamp)?;
        artifact::stamp_time(&info_path, timestamp)?;

        // Record only after the sidecars are durably on disk
        self.ledger.record(&media_info_url)?;

        for item in &media_info.items {
            let timestamp = item.taken_at;
            if let Some(children) = &item.carousel_media {
                for child in children {
                    let result = self.save_rendition_set(
                        child.id.as_deref(),
                        child.image_versions2.as_ref(),
                        timestamp,
                    );
                    self.isolate_rendition(result, child.id.as_deref())?;
                }
            } else if item.image_versions2.is_some() {
                let result = self.save_rendition_set(
                    item.id.as_deref(),
                    item.image_versions2.as_ref(),
                    timestamp,
                );
                self.isolate_rendition(result, item.id.as_deref())?;
            }
        }
        Ok(())
    }

    /// Keeps a per-rendition classification failure from sinking siblings
    fn isolate_rendition(&mut self, result: Result<()>, id: Option<&str>) -> Result<()> {
        match result {
            Ok(()) => Ok(()),
            Err(e) if is_fatal(&e) => Err(e),
            Err(e) => {
                tracing::error!("Failed to capture renditions for media {:?}: {}", id, e);
                if let Some(id) = id {
                    self.failed_urls.insert(id.to_string());
                }
                Ok(())
            }
        }
    }

    /// Selects, probes, fetches, and records the best rendition of an image
    ///
    /// Dedup here is per-rendition on the redirect-resolved URL: the same
    /// rendition can recur across posts (a reused profile picture), whereas
    /// a media-info URL cannot.
    fn save_rendition_set(
        &mut self,
        media_id: Option<&str>,
        versions: Option<&ImageVersions>,
        timestamp: i64,
    ) -> Result<()> {
        let candidates = versions.map(|v| v.candidates.as_slice()).unwrap_or(&[]);
        let Some(best) = select_best(candidates) else {
            tracing::warn!("No image renditions for media {:?}.", media_id);
            return Ok(());
        };
        if self.ledger.is_captured(&best.url)? {
            return Ok(());
        }

        let probe = self.session.head(&best.url)?;
        if probe.status != 200 {
            tracing::warn!("HEAD request failed with status code {}.", probe.status);
            return Ok(());
        }
        let content_type = probe.content_type.as_deref().unwrap_or("");
        let ext = artifact::extension_for(content_type)?;
        let Some(media_id) = media_id else {
            tracing::warn!("Rendition set without a media id; skipping.");
            return Ok(());
        };

        let bytes = match self.session.get_bytes(&best.url) {
            Ok(bytes) => bytes,
            Err(SessionError::Status { status, .. }) => {
                tracing::warn!("Image GET failed with status code {}.", status);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        let path = self.output_dir.join(format!("{media_id}.{ext}"));
        artifact::write_if_absent(&path, &bytes)?;
        artifact::stamp_time(&path, timestamp)?;
        self.ledger.record(&probe.final_url)?;
        Ok(())
    }
}
