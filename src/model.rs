//! Data model for the scraped API
//!
//! The upstream API is reverse-engineered and drifts over time, so every
//! container type captures unmodeled fields with `#[serde(flatten)]`. Raw
//! sidecar files are written from these types, and the flatten maps keep
//! them faithful to the wire payload instead of truncating it to the fields
//! the walker happens to read.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Deserializes an identifier that the API sends as either string or number
fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number identifier, got {other}"
        ))),
    }
}

/// One entry in a paginated content list, wrapping a content node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub node: MediaNode,
}

/// A content node as delivered by the timeline connection
///
/// The variant (image, video, carousel, unknown) is not encoded here; it is
/// derived by [`crate::walker::classify`] from the type tag and payload.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MediaNode {
    /// Type tag controlled by the upstream API; unrecognized values are
    /// classified as unknown rather than rejected.
    #[serde(
        rename = "__typename",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub typename: Option<String>,

    /// Stable media identifier
    #[serde(
        default,
        deserialize_with = "opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,

    /// Primary key used by the media-info endpoint (also the carousel id)
    #[serde(
        default,
        deserialize_with = "opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub pk: Option<String>,

    /// Short public identifier used in the post's user-facing URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// DASH manifest; present means the node is directly playable video
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_dash_manifest: Option<String>,

    /// Inline carousel children (present on multi-item posts in some
    /// responses; children never nest further)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carousel_media: Option<Vec<MediaNode>>,

    /// Comment count when the response includes it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_count: Option<i64>,

    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// Cursor-based pagination state for a connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageInfo {
    /// Opaque continuation token; ignored when `has_next_page` is false
    #[serde(default)]
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
}

/// One page of the user timeline connection
#[derive(Debug, Clone, Deserialize)]
pub struct TimelineConnection {
    pub edges: Vec<Edge>,
    pub page_info: PageInfo,
}

/// GraphQL envelope around the timeline connection
#[derive(Debug, Clone, Deserialize)]
pub struct TimelineResponse {
    pub xdt_api__v1__feed__user_timeline_graphql_connection: TimelineConnection,
}

/// One available resolution/encoding of an image asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rendition {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

/// The candidate rendition list of an image
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageVersions {
    #[serde(default)]
    pub candidates: Vec<Rendition>,
}

/// A carousel child inside a media-info item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarouselItem {
    #[serde(deserialize_with = "opt_string_or_number", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub image_versions2: Option<ImageVersions>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// One item of a media-info document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInfoItem {
    #[serde(deserialize_with = "opt_string_or_number", default)]
    pub id: Option<String>,
    /// Unix timestamp of the post's creation
    pub taken_at: i64,
    #[serde(default)]
    pub image_versions2: Option<ImageVersions>,
    #[serde(default)]
    pub carousel_media: Option<Vec<CarouselItem>>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// The per-post metadata document from the media-info endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInfo {
    pub items: Vec<MediaInfoItem>,
    /// The endpoint is queried for exactly one result set; a true value
    /// here is a consistency error.
    #[serde(default)]
    pub more_available: bool,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// One page of a node's comment feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentPage {
    #[serde(default)]
    pub can_view_more_preview_comments: bool,
    #[serde(default)]
    pub next_min_id: Option<String>,
    #[serde(default)]
    pub comments: Vec<Value>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// Timeline media embedded in the profile-info document
#[derive(Debug, Clone, Deserialize)]
pub struct TimelineMedia {
    pub edges: Vec<Edge>,
}

/// The user block of the profile-info document
#[derive(Debug, Clone, Deserialize)]
pub struct UserInfo {
    #[serde(deserialize_with = "opt_string_or_number", default)]
    pub id: Option<String>,
    pub profile_pic_url_hd: String,
    pub edge_owner_to_timeline_media: TimelineMedia,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebProfileInfoData {
    pub user: UserInfo,
}

/// The `web_profile_info` response
#[derive(Debug, Clone, Deserialize)]
pub struct WebProfileInfo {
    pub data: WebProfileInfoData,
}

/// One entry of the highlights tray
#[derive(Debug, Clone, Deserialize)]
pub struct HighlightItem {
    pub id: String,
}

/// The highlights-tray response
#[derive(Debug, Clone, Deserialize)]
pub struct HighlightsTray {
    #[serde(default)]
    pub tray: Vec<HighlightItem>,
}

/// One entry of the saved-posts feed
#[derive(Debug, Clone, Deserialize)]
pub struct SavedItem {
    pub media: MediaNode,
}

/// The saved-posts feed response
#[derive(Debug, Clone, Deserialize)]
pub struct SavedFeed {
    #[serde(default)]
    pub items: Vec<SavedItem>,
    #[serde(default)]
    pub more_available: bool,
}
