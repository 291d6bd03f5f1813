//! Node classification
//!
//! The upstream type tag is an opaque string the API controls; unrecognized
//! tags map to [`NodeKind::Unknown`] instead of failing, so schema drift
//! degrades to flagged items rather than aborted runs.

use crate::model::MediaNode;

/// The one type tag this archiver knows how to extract
pub const MEDIA_TYPENAME: &str = "XDTMediaDict";

/// The variant of a content node, deciding its extraction strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A single image post (also carousels whose children only surface in
    /// the media-info document)
    Image,
    /// A directly playable video: carries an embedded DASH manifest and is
    /// deferred to the external extractor
    Video,
    /// A multi-item post with inline children
    Carousel,
    /// Anything with an unrecognized type tag; routed to the failed set for
    /// human follow-up
    Unknown,
}

/// Classifies a content node
///
/// Dispatch order matters: a video node may also carry image renditions
/// (its thumbnail), and a carousel node has no manifest of its own.
pub fn classify(node: &MediaNode) -> NodeKind {
    if node.typename.as_deref() != Some(MEDIA_TYPENAME) {
        return NodeKind::Unknown;
    }
    if node.video_dash_manifest.is_some() {
        return NodeKind::Video;
    }
    if node
        .carousel_media
        .as_ref()
        .is_some_and(|children| !children.is_empty())
    {
        return NodeKind::Carousel;
    }
    NodeKind::Image
}
