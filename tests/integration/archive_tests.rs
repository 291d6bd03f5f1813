//! End-to-end archival tests against a mock HTTP server
//!
//! The archiver's HTTP session is blocking, so each scenario runs the
//! archiver on a blocking task while the mock server lives on the async
//! test runtime.

use ig_archiver::client::Endpoints;
use ig_archiver::config::SessionConfig;
use ig_archiver::ledger::Ledger;
use ig_archiver::{ProfileArchiver, SavedArchiver, Session, VideoExtractor};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, UNIX_EPOCH};
use url::Url;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const COOKIES: &str = "csrftoken=testtoken; sessionid=testsession";
const TAKEN_AT: i64 = 1_600_000_000;

/// Extractor double recording every URL it is handed
struct RecordingExtractor {
    urls: Mutex<Vec<String>>,
    succeed: bool,
}

impl RecordingExtractor {
    fn new(succeed: bool) -> Arc<Self> {
        Arc::new(Self {
            urls: Mutex::new(Vec::new()),
            succeed,
        })
    }

    fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

impl VideoExtractor for RecordingExtractor {
    fn extract(&self, url: &str) -> bool {
        self.urls.lock().unwrap().push(url.to_string());
        self.succeed
    }
}

fn image_edge(id: &str, pk: &str, code: &str) -> Value {
    json!({"node": {"__typename": "XDTMediaDict", "id": id, "pk": pk, "code": code}})
}

fn video_edge(id: &str, pk: &str, code: &str) -> Value {
    json!({"node": {"__typename": "XDTMediaDict", "id": id, "pk": pk, "code": code,
                    "video_dash_manifest": "<MPD/>"}})
}

fn profile_info(server_uri: &str, edges: Value) -> Value {
    json!({"data": {"user": {
        "id": "777",
        "profile_pic_url_hd": format!("{server_uri}/pp.jpg"),
        "edge_owner_to_timeline_media": {"edges": edges}
    }}})
}

fn graphql_page(edges: Value, has_next: bool, cursor: Option<&str>) -> Value {
    json!({"status": "ok", "data": {
        "xdt_api__v1__feed__user_timeline_graphql_connection": {
            "edges": edges,
            "page_info": {"has_next_page": has_next, "end_cursor": cursor}
        }
    }})
}

fn media_info(item_id: &str, image_url: &str) -> Value {
    json!({"items": [{
        "id": item_id,
        "taken_at": TAKEN_AT,
        "image_versions2": {"candidates": [
            {"url": image_url, "width": 1080, "height": 1080},
            {"url": format!("{image_url}?size=small"), "width": 150, "height": 150}
        ]}
    }], "more_available": false})
}

/// Mounts the endpoints every profile scrape hits before reaching the
/// timeline: profile page, profile info, profile picture, highlights tray.
async fn mount_profile_preamble(server: &MockServer, edges: Value) {
    Mock::given(method("GET"))
        .and(path("/alice/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/users/web_profile_info/"))
        .and(query_param("username", "alice"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_info(&server.uri(), edges)))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/pp.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"profile-pic-bytes".to_vec()))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/highlights/777/highlights_tray/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"tray": [{"id": "highlight:99"}]})),
        )
        .mount(server)
        .await;
}

/// Mounts the media-info document and image fetch for one post
async fn mount_media(server: &MockServer, pk: &str, item_id: &str, image_path: &str) {
    let image_url = format!("{}{}", server.uri(), image_path);
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/media/{pk}/info/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(media_info(item_id, &image_url)))
        .mount(server)
        .await;
    Mock::given(method("HEAD"))
        .and(path(image_path))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "image/jpeg"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(image_path))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg-bytes".to_vec()))
        .mount(server)
        .await;
}

async fn run_profile(
    server: &MockServer,
    dir: &Path,
    extractor: Arc<RecordingExtractor>,
    save_comments: bool,
) -> ig_archiver::Result<()> {
    let uri = server.uri();
    let dir = dir.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let endpoints = Endpoints {
            web: Url::parse(&uri).unwrap(),
            api: Url::parse(&uri).unwrap(),
        };
        let session = Session::with_endpoints(Some(COOKIES), endpoints)?;
        let mut config = SessionConfig::new(dir);
        config.save_comments = save_comments;
        let ledger = Ledger::open(&config.ledger_path())?;
        ProfileArchiver::new(&session, &ledger, &config, extractor.as_ref(), "alice").process()
    })
    .await
    .unwrap()
}

fn count_requests(requests: &[Request], http_method: &str, url_path: &str) -> usize {
    requests
        .iter()
        .filter(|r| r.method.to_string() == http_method && r.url.path() == url_path)
        .count()
}

#[tokio::test]
async fn test_profile_happy_path() {
    let server = MockServer::start().await;
    mount_profile_preamble(&server, json!([image_edge("101", "11", "abc")])).await;
    mount_media(&server, "11", "101", "/img11.jpg").await;
    Mock::given(method("POST"))
        .and(path("/graphql/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(graphql_page(json!([]), false, None)))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let extractor = RecordingExtractor::new(true);
    run_profile(&server, dir.path(), extractor.clone(), false)
        .await
        .unwrap();

    assert!(dir.path().join("web_profile_info.json").exists());
    assert_eq!(
        std::fs::read(dir.path().join("profile_pic.jpg")).unwrap(),
        b"profile-pic-bytes"
    );
    assert!(dir.path().join("101.json").exists());
    assert!(dir.path().join("101-media-info-0000.json").exists());
    assert_eq!(
        std::fs::read(dir.path().join("101.jpg")).unwrap(),
        b"jpeg-bytes"
    );
    assert!(!dir.path().join("failed.txt").exists());

    // Sidecars carry the post's own creation time
    let mtime = std::fs::metadata(dir.path().join("101.json"))
        .unwrap()
        .modified()
        .unwrap();
    assert_eq!(
        mtime,
        UNIX_EPOCH + Duration::from_secs(TAKEN_AT as u64)
    );

    // Highlights land in the deferred extraction batch
    assert_eq!(
        extractor.urls(),
        vec![format!("{}/stories/highlights/99/", server.uri())]
    );
}

#[tokio::test]
async fn test_mixed_edges_defer_videos_and_capture_images() {
    let server = MockServer::start().await;
    mount_profile_preamble(
        &server,
        json!([image_edge("101", "11", "abc"), video_edge("202", "22", "vid1")]),
    )
    .await;
    mount_media(&server, "11", "101", "/img11.jpg").await;
    Mock::given(method("POST"))
        .and(path("/graphql/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(graphql_page(json!([]), false, None)))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let extractor = RecordingExtractor::new(true);
    run_profile(&server, dir.path(), extractor.clone(), false)
        .await
        .unwrap();

    // The video edge produced no media-info fetch, only a deferred URL
    let requests = server.received_requests().await.unwrap();
    assert_eq!(count_requests(&requests, "GET", "/api/v1/media/11/info/"), 1);
    assert_eq!(count_requests(&requests, "GET", "/api/v1/media/22/info/"), 0);
    assert!(extractor
        .urls()
        .contains(&format!("{}/p/vid1/", server.uri())));
    assert!(dir.path().join("101.jpg").exists());
    assert!(!dir.path().join("202.json").exists());
}

#[tokio::test]
async fn test_second_run_fetches_nothing_new() {
    let server = MockServer::start().await;
    mount_profile_preamble(&server, json!([image_edge("101", "11", "abc")])).await;
    mount_media(&server, "11", "101", "/img11.jpg").await;
    Mock::given(method("POST"))
        .and(path("/graphql/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(graphql_page(json!([]), false, None)))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let extractor = RecordingExtractor::new(true);
    run_profile(&server, dir.path(), extractor.clone(), false)
        .await
        .unwrap();
    run_profile(&server, dir.path(), extractor.clone(), false)
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    // Media, image, and profile picture were only fetched on the first run
    assert_eq!(count_requests(&requests, "GET", "/api/v1/media/11/info/"), 1);
    assert_eq!(count_requests(&requests, "GET", "/img11.jpg"), 1);
    assert_eq!(count_requests(&requests, "HEAD", "/img11.jpg"), 1);
    assert_eq!(count_requests(&requests, "GET", "/pp.jpg"), 1);
    // The highlight was extracted once, then found in the ledger
    assert_eq!(extractor.urls().len(), 1);
    // The profile document itself is refreshed every run
    assert_eq!(
        count_requests(&requests, "GET", "/api/v1/users/web_profile_info/"),
        2
    );
}

#[tokio::test]
async fn test_timeline_pagination_walks_every_page() {
    let server = MockServer::start().await;
    mount_profile_preamble(&server, json!([])).await;
    mount_media(&server, "11", "101", "/img11.jpg").await;
    mount_media(&server, "22", "202", "/img22.jpg").await;

    // The continuation query carries the cursor under "after"; the first
    // query does not, which is how the two mocks are told apart.
    Mock::given(method("POST"))
        .and(path("/graphql/query"))
        .and(body_string_contains("after"))
        .respond_with(ResponseTemplate::new(200).set_body_json(graphql_page(
            json!([image_edge("202", "22", "def")]),
            false,
            None,
        )))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/graphql/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(graphql_page(
            json!([image_edge("101", "11", "abc")]),
            true,
            Some("CURSOR1"),
        )))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let extractor = RecordingExtractor::new(true);
    run_profile(&server, dir.path(), extractor, false)
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(count_requests(&requests, "POST", "/graphql/query"), 2);
    assert!(dir.path().join("101.jpg").exists());
    assert!(dir.path().join("202.jpg").exists());
}

#[tokio::test]
async fn test_failed_first_graphql_query_keeps_preamble_results() {
    let server = MockServer::start().await;
    mount_profile_preamble(&server, json!([image_edge("101", "11", "abc")])).await;
    mount_media(&server, "11", "101", "/img11.jpg").await;
    Mock::given(method("POST"))
        .and(path("/graphql/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "fail"})))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let extractor = RecordingExtractor::new(true);
    run_profile(&server, dir.path(), extractor, false)
        .await
        .unwrap();

    // The profile-document edges were still archived
    assert!(dir.path().join("101.jpg").exists());
}

#[tokio::test]
async fn test_media_info_redirect_aborts_run() {
    let server = MockServer::start().await;
    mount_profile_preamble(&server, json!([image_edge("101", "11", "abc")])).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/media/11/info/"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Location", "/accounts/login/"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/accounts/login/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("login"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let extractor = RecordingExtractor::new(true);
    let result = run_profile(&server, dir.path(), extractor, false).await;

    assert!(result.is_err());
    assert!(!dir.path().join("101.json").exists());
}

#[tokio::test]
async fn test_comments_collected_and_written_once() {
    let server = MockServer::start().await;
    mount_profile_preamble(&server, json!([json!({"node": {
        "__typename": "XDTMediaDict", "id": "101", "pk": "11", "code": "abc",
        "comment_count": 3
    }})]))
    .await;
    mount_media(&server, "11", "101", "/img11.jpg").await;
    Mock::given(method("POST"))
        .and(path("/graphql/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(graphql_page(json!([]), false, None)))
        .mount(&server)
        .await;

    // Two comment pages chained by next_min_id
    Mock::given(method("GET"))
        .and(path("/api/v1/media/101/comments/"))
        .and(query_param("min_id", "MIN1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "comments": [{"pk": "c3", "text": "third"}],
            "can_view_more_preview_comments": false
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/media/101/comments/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "comments": [{"pk": "c1", "text": "first"}, {"pk": "c2", "text": "second"}],
            "can_view_more_preview_comments": true,
            "next_min_id": "MIN1"
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let extractor = RecordingExtractor::new(true);
    run_profile(&server, dir.path(), extractor, true)
        .await
        .unwrap();

    let contents = std::fs::read_to_string(dir.path().join("101-comments.json")).unwrap();
    let merged: Value = serde_json::from_str(&contents).unwrap();
    let texts: Vec<&str> = merged["comments"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["text"].as_str().unwrap())
        .collect();
    assert_eq!(texts, ["first", "second", "third"]);
}

#[tokio::test]
async fn test_failed_video_extraction_lands_in_failed_txt() {
    let server = MockServer::start().await;
    mount_profile_preamble(&server, json!([video_edge("202", "22", "vid1")])).await;
    Mock::given(method("POST"))
        .and(path("/graphql/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(graphql_page(json!([]), false, None)))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let extractor = RecordingExtractor::new(false);
    run_profile(&server, dir.path(), extractor, false)
        .await
        .unwrap();

    let failed = std::fs::read_to_string(dir.path().join("failed.txt")).unwrap();
    assert!(failed.contains(&format!("{}/p/vid1/", server.uri())));
}

#[tokio::test]
async fn test_saved_posts_archive_and_unsave() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/feed/saved/posts/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {"media": {"id": "101", "pk": "11", "code": "abc"}},
                {"media": {"id": "202", "pk": "22", "code": "vid1",
                           "video_dash_manifest": "<MPD/>"}}
            ],
            "more_available": false
        })))
        .mount(&server)
        .await;
    mount_media(&server, "11", "101", "/img11.jpg").await;
    for code in ["abc", "vid1"] {
        Mock::given(method("POST"))
            .and(path(format!("/web/save/{code}/unsave/")))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
    }

    let dir = tempfile::tempdir().unwrap();
    let extractor = RecordingExtractor::new(true);
    let uri = server.uri();
    let dir_path = dir.path().to_path_buf();
    let task_extractor = extractor.clone();
    tokio::task::spawn_blocking(move || {
        let endpoints = Endpoints {
            web: Url::parse(&uri).unwrap(),
            api: Url::parse(&uri).unwrap(),
        };
        let session = Session::with_endpoints(Some(COOKIES), endpoints)?;
        let config = SessionConfig::new(dir_path);
        let ledger = Ledger::open(&config.ledger_path())?;
        SavedArchiver::new(&session, &ledger, &config, task_extractor.as_ref(), true).process()
    })
    .await
    .unwrap()
    .unwrap();

    assert!(dir.path().join("101.jpg").exists());
    assert!(extractor
        .urls()
        .contains(&format!("{}/p/vid1/", server.uri())));

    let requests = server.received_requests().await.unwrap();
    assert_eq!(count_requests(&requests, "POST", "/web/save/abc/unsave/"), 1);
    assert_eq!(count_requests(&requests, "POST", "/web/save/vid1/unsave/"), 1);
}

#[tokio::test]
async fn test_carousel_children_from_media_info() {
    let server = MockServer::start().await;
    mount_profile_preamble(&server, json!([image_edge("101", "11", "abc")])).await;
    Mock::given(method("POST"))
        .and(path("/graphql/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(graphql_page(json!([]), false, None)))
        .mount(&server)
        .await;

    // Carousel post: the media-info items carry per-child rendition sets
    let img_a = format!("{}/childA.jpg", server.uri());
    let img_b = format!("{}/childB.jpg", server.uri());
    Mock::given(method("GET"))
        .and(path("/api/v1/media/11/info/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{
                "id": "101",
                "taken_at": TAKEN_AT,
                "image_versions2": {"candidates": []},
                "carousel_media": [
                    {"id": "101_1", "image_versions2": {"candidates": [
                        {"url": img_a, "width": 1080, "height": 1080}]}},
                    {"id": "101_2", "image_versions2": {"candidates": [
                        {"url": img_b, "width": 1080, "height": 1350}]}}
                ]
            }],
            "more_available": false
        })))
        .mount(&server)
        .await;
    for child in ["/childA.jpg", "/childB.jpg"] {
        Mock::given(method("HEAD"))
            .and(path(child))
            .respond_with(ResponseTemplate::new(200).insert_header("content-type", "image/jpeg"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(child))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg-bytes".to_vec()))
            .mount(&server)
            .await;
    }

    let dir = tempfile::tempdir().unwrap();
    let extractor = RecordingExtractor::new(true);
    run_profile(&server, dir.path(), extractor, false)
        .await
        .unwrap();

    assert!(dir.path().join("101_1.jpg").exists());
    assert!(dir.path().join("101_2.jpg").exists());
}
