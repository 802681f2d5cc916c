//! YouTube Shorts publisher.
//!
//! Videos are uploaded in a single `multipart/related` request. The id
//! returned by the upload is already the final video id, so finalizing is a
//! no-op once processing reports `processed`.

mod auth;

pub use auth::{refresh_access_token, GoogleCredentials, TokenCache};

use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use reelpost_http::{HttpClient, RequestOptions};
use reelpost_models::{Platform, PostMetadata, StagedMedia};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::credentials::{env_credential, require};
use crate::error::{PlatformError, PlatformResult};
use crate::instagram::string_field;
use crate::publisher::{ensure_supported, load_media_bytes, PlatformPublisher, StatusCheck};

pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_UPLOAD_URL: &str = "https://www.googleapis.com/upload/youtube/v3";
pub const DEFAULT_API_URL: &str = "https://www.googleapis.com/youtube/v3";

/// Title used when a post has no caption.
const DEFAULT_TITLE: &str = "New Short";

/// YouTube titles are limited to 100 characters.
const MAX_TITLE_CHARS: usize = 100;

/// "People & Blogs"
const CATEGORY_ID: &str = "22";

/// YouTube configuration.
#[derive(Debug, Clone)]
pub struct YouTubeConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
    pub privacy_status: String,
    pub token_url: String,
    pub upload_url: String,
    pub api_url: String,
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            refresh_token: None,
            privacy_status: "public".to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            upload_url: DEFAULT_UPLOAD_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
        }
    }
}

impl YouTubeConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            client_id: env_credential("GOOGLE_CLIENT_ID"),
            client_secret: env_credential("GOOGLE_CLIENT_SECRET"),
            refresh_token: env_credential("GOOGLE_REFRESH_TOKEN"),
            privacy_status: std::env::var("YOUTUBE_PRIVACY_STATUS")
                .unwrap_or_else(|_| "public".to_string()),
            ..Default::default()
        }
    }
}

/// YouTube Shorts publisher.
///
/// Owns its access-token cache; a single-flight refresh happens under the
/// mutex.
pub struct YouTubePublisher {
    http: HttpClient,
    config: YouTubeConfig,
    token: Mutex<Option<TokenCache>>,
}

impl YouTubePublisher {
    pub fn new(http: HttpClient, config: YouTubeConfig) -> Self {
        Self {
            http,
            config,
            token: Mutex::new(None),
        }
    }

    fn credentials(&self) -> PlatformResult<GoogleCredentials<'_>> {
        Ok(GoogleCredentials {
            client_id: require(Platform::YouTube, "GOOGLE_CLIENT_ID", &self.config.client_id)?,
            client_secret: require(
                Platform::YouTube,
                "GOOGLE_CLIENT_SECRET",
                &self.config.client_secret,
            )?,
            refresh_token: require(
                Platform::YouTube,
                "GOOGLE_REFRESH_TOKEN",
                &self.config.refresh_token,
            )?,
        })
    }

    async fn access_token(&self) -> PlatformResult<String> {
        let credentials = self.credentials()?;
        let mut guard = self.token.lock().await;
        let token =
            refresh_access_token(&self.http, &self.config.token_url, credentials, guard.take())
                .await?;
        let access_token = token.access_token.clone();
        *guard = Some(token);
        Ok(access_token)
    }

    fn video_metadata(&self, metadata: &PostMetadata) -> Value {
        let caption = metadata.caption_or(DEFAULT_TITLE);
        let title: String = caption.chars().take(MAX_TITLE_CHARS).collect();
        json!({
            "snippet": {
                "title": title,
                "description": caption,
                "tags": ["shorts", "video"],
                "categoryId": CATEGORY_ID,
            },
            "status": {
                "privacyStatus": self.config.privacy_status,
                "selfDeclaredMadeForKids": false,
            }
        })
    }
}

/// Build a `multipart/related` body: a JSON metadata part followed by the
/// binary media part.
fn multipart_related(boundary: &str, metadata: &Value, media: &[u8], mime_type: &str) -> Bytes {
    let head = format!(
        concat!(
            "--{b}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{meta}\r\n",
            "--{b}\r\nContent-Type: {mime}\r\nContent-Transfer-Encoding: binary\r\n\r\n",
        ),
        b = boundary,
        meta = metadata,
        mime = mime_type,
    );
    let tail = format!("\r\n--{}--\r\n", boundary);

    let mut body = BytesMut::with_capacity(head.len() + media.len() + tail.len());
    body.put_slice(head.as_bytes());
    body.put_slice(media);
    body.put_slice(tail.as_bytes());
    body.freeze()
}

#[async_trait]
impl PlatformPublisher for YouTubePublisher {
    fn platform(&self) -> Platform {
        Platform::YouTube
    }

    fn check_credentials(&self) -> PlatformResult<()> {
        self.credentials().map(|_| ())
    }

    async fn submit(&self, media: &StagedMedia, metadata: &PostMetadata) -> PlatformResult<String> {
        ensure_supported(self, media.kind)?;
        let token = self.access_token().await?;
        let data = load_media_bytes(&self.http, media).await?;

        let boundary = format!("reelpost_{}", Uuid::new_v4().simple());
        let body = multipart_related(
            &boundary,
            &self.video_metadata(metadata),
            &data,
            &media.mime_type,
        );
        debug!(bytes = data.len(), "Uploading video to YouTube");

        let url = format!("{}/videos", self.config.upload_url);
        let options = RequestOptions::post("youtube.upload")
            .query("uploadType", "multipart")
            .query("part", "snippet,status")
            .bearer(token)
            .bytes(body, format!("multipart/related; boundary={}", boundary));
        let response = self
            .http
            .request(&url, &options)
            .await
            .map_err(|e| PlatformError::submission(e.to_string()))?;

        let video_id = string_field(&response, "id").ok_or_else(|| {
            PlatformError::submission(format!("video id missing in response: {}", response))
        })?;

        info!(video_id = %video_id, "Uploaded video to YouTube");
        Ok(video_id)
    }

    async fn check_status(&self, job_id: &str) -> PlatformResult<StatusCheck> {
        let token = self.access_token().await?;

        let url = format!("{}/videos", self.config.api_url);
        let options = RequestOptions::get("youtube.video_status")
            .query("id", job_id)
            .query("part", "status,processingDetails")
            .bearer(token);
        let body = self.http.request(&url, &options).await?;

        let video = body
            .get("items")
            .and_then(|items| items.get(0))
            .ok_or_else(|| {
                PlatformError::status_check(format!("video {} not found after upload", job_id))
            })?;

        let status = video
            .pointer("/status/uploadStatus")
            .and_then(Value::as_str)
            .unwrap_or("uploaded")
            .to_string();
        debug!(video_id = %job_id, upload_status = %status, "YouTube upload status");

        Ok(match status.as_str() {
            "processed" => StatusCheck::Finished,
            "failed" | "rejected" | "deleted" => {
                let detail = video
                    .pointer("/status/failureReason")
                    .or_else(|| video.pointer("/status/rejectionReason"))
                    .and_then(Value::as_str)
                    .map(str::to_string);
                StatusCheck::Failed { status, detail }
            }
            _ => StatusCheck::Processing(status),
        })
    }

    async fn finalize(&self, job_id: &str) -> PlatformResult<String> {
        Ok(job_id.to_string())
    }

    fn media_url(&self, media_id: &str) -> Option<String> {
        Some(format!("https://youtube.com/shorts/{}", media_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelpost_http::RetryConfig;
    use reelpost_models::{AssetId, MediaKind};
    use tempfile::TempDir;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn publisher(server: &MockServer) -> YouTubePublisher {
        YouTubePublisher::new(
            HttpClient::new(RetryConfig::fast(1)).unwrap(),
            YouTubeConfig {
                client_id: Some("cid".into()),
                client_secret: Some("secret".into()),
                refresh_token: Some("rt".into()),
                token_url: format!("{}/token", server.uri()),
                upload_url: format!("{}/upload/youtube/v3", server.uri()),
                api_url: format!("{}/youtube/v3", server.uri()),
                ..Default::default()
            },
        )
    }

    async fn mount_token(server: &MockServer, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"access_token": "at", "expires_in": 3600})),
            )
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    #[test]
    fn test_multipart_body_layout() {
        let body = multipart_related("b1", &json!({"k": "v"}), b"VIDEO", "video/mp4");
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.starts_with(concat!(
            "--b1\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n",
            "{\"k\":\"v\"}\r\n--b1\r\n",
        )));
        assert!(text.contains(concat!(
            "Content-Type: video/mp4\r\nContent-Transfer-Encoding: binary\r\n\r\n",
            "VIDEO\r\n--b1--\r\n",
        )));
    }

    #[test]
    fn test_missing_refresh_token_is_config_error() {
        let publisher = YouTubePublisher::new(
            HttpClient::new(RetryConfig::fast(1)).unwrap(),
            YouTubeConfig {
                client_id: Some("cid".into()),
                client_secret: Some("secret".into()),
                ..Default::default()
            },
        );
        let err = publisher.check_credentials().unwrap_err();
        assert!(err.to_string().contains("GOOGLE_REFRESH_TOKEN"));
    }

    #[test]
    fn test_title_is_truncated() {
        let publisher = YouTubePublisher::new(
            HttpClient::new(RetryConfig::fast(1)).unwrap(),
            YouTubeConfig::default(),
        );
        let metadata = PostMetadata {
            caption: Some("x".repeat(150)),
            kind: MediaKind::Video,
        };
        let meta = publisher.video_metadata(&metadata);
        assert_eq!(meta["snippet"]["title"].as_str().unwrap().len(), 100);
        assert_eq!(meta["snippet"]["description"].as_str().unwrap().len(), 150);
        assert_eq!(meta["status"]["privacyStatus"], "public");
    }

    #[tokio::test]
    async fn test_submit_uploads_multipart_and_reuses_token() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/upload/youtube/v3/videos"))
            .and(query_param("uploadType", "multipart"))
            .and(header("authorization", "Bearer at"))
            .and(body_string_contains("\"categoryId\":\"22\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "dQw4w9WgXcQ"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/youtube/v3/videos"))
            .and(query_param("id", "dQw4w9WgXcQ"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"items": [{"status": {"uploadStatus": "processed"}}]})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let local = dir.path().join("v.mp4");
        tokio::fs::write(&local, b"VIDEO").await.unwrap();
        let media = StagedMedia {
            asset_id: AssetId::from_source("v"),
            public_url: "https://cdn.example.com/v.mp4".into(),
            local_path: Some(local),
            kind: MediaKind::Video,
            mime_type: "video/mp4".into(),
        };

        let publisher = publisher(&server);
        let id = publisher.submit(&media, &PostMetadata::default()).await.unwrap();
        assert_eq!(id, "dQw4w9WgXcQ");
        assert_eq!(publisher.check_status(&id).await.unwrap(), StatusCheck::Finished);
        assert_eq!(publisher.finalize(&id).await.unwrap(), id);
        assert_eq!(
            publisher.media_url(&id).as_deref(),
            Some("https://youtube.com/shorts/dQw4w9WgXcQ")
        );
    }

    #[tokio::test]
    async fn test_photo_rejected_before_network() {
        let server = MockServer::start().await;
        mount_token(&server, 0).await;

        let media = StagedMedia {
            asset_id: AssetId::from_source("p"),
            public_url: "https://cdn.example.com/p.jpg".into(),
            local_path: None,
            kind: MediaKind::Photo,
            mime_type: "image/jpeg".into(),
        };
        let err = publisher(&server).submit(&media, &PostMetadata::default()).await.unwrap_err();
        assert!(matches!(err, PlatformError::UnsupportedMedia { platform: Platform::YouTube, .. }));
    }

    #[tokio::test]
    async fn test_status_vocabulary() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;
        Mock::given(method("GET"))
            .and(query_param("id", "failed-one"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"status": {"uploadStatus": "failed", "failureReason": "codec"}}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("id", "busy"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"status": {"uploadStatus": "uploaded"}}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("id", "gone"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
            .mount(&server)
            .await;

        let publisher = publisher(&server);
        assert_eq!(
            publisher.check_status("failed-one").await.unwrap(),
            StatusCheck::Failed {
                status: "failed".into(),
                detail: Some("codec".into())
            }
        );
        assert_eq!(
            publisher.check_status("busy").await.unwrap(),
            StatusCheck::Processing("uploaded".into())
        );
        assert!(matches!(
            publisher.check_status("gone").await.unwrap_err(),
            PlatformError::StatusCheck(_)
        ));
    }
}
