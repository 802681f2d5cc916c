//! Router behaviour against an always-succeeding platform and in-memory storage.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use reelpost_api::{create_router, ApiConfig, AppState, PublishStatus, RequestState};
use reelpost_models::{Platform, PostMetadata, StagedMedia};
use reelpost_platforms::{PlatformPublisher, PlatformResult, StatusCheck};
use reelpost_storage::{InMemoryStore, ScratchDir};
use reelpost_worker::{MediaStager, MultiPlatformPublisher, Orchestrator, PollPolicy, UploadQueue};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio_test::assert_ok;
use tower::ServiceExt;

const KEY: &str = "test-key";

struct InstantPlatform(Platform);

#[async_trait]
impl PlatformPublisher for InstantPlatform {
    fn platform(&self) -> Platform {
        self.0
    }

    fn check_credentials(&self) -> PlatformResult<()> {
        Ok(())
    }

    async fn submit(
        &self,
        _media: &StagedMedia,
        _metadata: &PostMetadata,
    ) -> PlatformResult<String> {
        Ok("job-1".to_string())
    }

    async fn check_status(&self, _job_id: &str) -> PlatformResult<StatusCheck> {
        Ok(StatusCheck::Finished)
    }

    async fn finalize(&self, _job_id: &str) -> PlatformResult<String> {
        Ok(format!("{}-media", self.0))
    }
}

/// Platform whose submission panics mid-publish.
struct PanickingPlatform;

#[async_trait]
impl PlatformPublisher for PanickingPlatform {
    fn platform(&self) -> Platform {
        Platform::TikTok
    }

    fn check_credentials(&self) -> PlatformResult<()> {
        Ok(())
    }

    async fn submit(
        &self,
        _media: &StagedMedia,
        _metadata: &PostMetadata,
    ) -> PlatformResult<String> {
        panic!("upload client crashed");
    }

    async fn check_status(&self, _job_id: &str) -> PlatformResult<StatusCheck> {
        Ok(StatusCheck::Finished)
    }

    async fn finalize(&self, _job_id: &str) -> PlatformResult<String> {
        Ok("never".to_string())
    }
}

struct Fixture {
    _dir: TempDir,
    store: Arc<InMemoryStore>,
    state: AppState,
}

impl Fixture {
    fn new(api_key: Option<&str>) -> Self {
        let platforms = [Platform::Instagram, Platform::TikTok]
            .into_iter()
            .map(|p| Arc::new(InstantPlatform(p)) as Arc<dyn PlatformPublisher>)
            .collect();
        Self::with_platforms(api_key, platforms)
    }

    fn with_platforms(api_key: Option<&str>, platforms: Vec<Arc<dyn PlatformPublisher>>) -> Self {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(InMemoryStore::new("https://cdn.example.com"));
        let staging = Arc::new(MediaStager::new(
            ScratchDir::new(dir.path()),
            store.clone(),
            "staging/",
        ));
        let policy = PollPolicy {
            initial_delay: Duration::from_millis(1),
            interval: Duration::from_millis(1),
            max_attempts: 2,
        };

        let orchestrators = platforms
            .into_iter()
            .map(|p| Orchestrator::new(p, staging.clone(), policy))
            .collect();
        let publisher = MultiPlatformPublisher::new(orchestrators, staging);
        let queue = UploadQueue::new(store.clone(), "queue/", "failed/");

        let config = ApiConfig {
            api_key: api_key.map(str::to_string),
            ..Default::default()
        };

        Self {
            _dir: dir,
            store,
            state: AppState::from_parts(config, publisher, queue),
        }
    }

    fn router(&self) -> Router {
        create_router(self.state.clone(), None)
    }
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn wait_until_finished(fixture: &Fixture, request_id: &str) -> PublishStatus {
    for _ in 0..200 {
        let current = fixture.state.tracker.get(request_id).unwrap();
        if current.state != RequestState::Running {
            return current;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("publish request {} did not finish", request_id);
}

fn publish_request(body: Value, key: Option<&str>) -> Request<Body> {
    let mut builder =
        Request::post("/api/publish").header(header::CONTENT_TYPE, "application/json");
    if let Some(key) = key {
        builder = builder.header("x-api-key", key);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn health_needs_no_key() {
    let fixture = Fixture::new(Some(KEY));
    let response = assert_ok!(
        fixture
            .router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
    );

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "healthy");
}

#[tokio::test]
async fn trigger_routes_reject_missing_or_wrong_key() {
    let fixture = Fixture::new(Some(KEY));
    let body = json!({ "video_url": "https://cdn.example.com/a.mp4" });

    let missing = fixture
        .router()
        .oneshot(publish_request(body.clone(), None))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let wrong = fixture
        .router()
        .oneshot(publish_request(body, Some("nope")))
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert!(json_body(wrong).await["detail"].as_str().unwrap().contains("invalid API key"));

    let queue = fixture
        .router()
        .oneshot(Request::get("/api/queue").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(queue.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn publish_runs_in_background_and_reports_results() {
    let fixture = Fixture::new(Some(KEY));
    let body = json!({
        "video_url": "https://cdn.example.com/a.mp4",
        "caption": "launch day",
        "platforms": ["tiktok"]
    });

    let response = fixture
        .router()
        .oneshot(publish_request(body, Some(KEY)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let accepted = json_body(response).await;
    assert_eq!(accepted["platforms"], json!(["tiktok"]));
    let request_id = accepted["request_id"].as_str().unwrap().to_string();

    let status = wait_until_finished(&fixture, &request_id).await;
    assert_eq!(status.state, RequestState::Completed);
    assert_eq!(status.status_lines.len(), 1);
    assert!(!status.events.is_empty());

    let response = fixture
        .router()
        .oneshot(
            Request::get(format!("/api/publish/{}", request_id))
                .header("x-api-key", KEY)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["state"], "completed");
    assert!(body["summary"].as_str().unwrap().contains("Success rate: 1/1 platforms"));
}

#[tokio::test]
async fn panicking_publish_marks_request_failed() {
    let platform: Arc<dyn PlatformPublisher> = Arc::new(PanickingPlatform);
    let fixture = Fixture::with_platforms(None, vec![platform]);
    let body = json!({ "video_url": "https://cdn.example.com/a.mp4" });

    let response = fixture.router().oneshot(publish_request(body, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let request_id = json_body(response).await["request_id"]
        .as_str()
        .unwrap()
        .to_string();

    let status = wait_until_finished(&fixture, &request_id).await;
    assert_eq!(status.state, RequestState::Failed);
    assert!(status.summary.unwrap().contains("Publish task aborted"));
    assert!(status.report.is_none());
}

#[tokio::test]
async fn publish_rejects_bad_requests() {
    let fixture = Fixture::new(None);

    let no_url = fixture
        .router()
        .oneshot(publish_request(json!({ "caption": "x" }), None))
        .await
        .unwrap();
    assert_eq!(no_url.status(), StatusCode::BAD_REQUEST);

    let unconfigured = fixture
        .router()
        .oneshot(publish_request(
            json!({ "video_url": "https://cdn.example.com/a.mp4", "platforms": ["youtube"] }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(unconfigured.status(), StatusCode::BAD_REQUEST);
    assert!(fixture.state.tracker.is_empty());
}

#[tokio::test]
async fn unknown_publish_request_is_not_found() {
    let fixture = Fixture::new(None);
    let response = fixture
        .router()
        .oneshot(
            Request::get("/api/publish/does-not-exist")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn uploads_are_queued_and_listed() {
    let fixture = Fixture::new(None);

    let response = fixture
        .router()
        .oneshot(
            Request::post("/api/uploads?file_id=clip-42")
                .header(header::CONTENT_TYPE, "video/mp4")
                .body(Body::from("video-bytes"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let uploaded = json_body(response).await;
    let key = uploaded["key"].as_str().unwrap().to_string();
    assert!(key.starts_with("queue/"));
    assert!(key.ends_with(".mp4"));
    assert!(fixture.store.contains(&key).await);

    let response = fixture
        .router()
        .oneshot(Request::get("/api/queue").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listing = json_body(response).await;
    assert_eq!(listing["pending"], 1);
    assert_eq!(listing["items"][0]["key"], key.as_str());
}

#[tokio::test]
async fn empty_upload_is_rejected() {
    let fixture = Fixture::new(None);
    let response = fixture
        .router()
        .oneshot(
            Request::post("/api/uploads?file_id=clip")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(fixture.store.is_empty().await);
}
