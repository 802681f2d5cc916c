//! TikTok Content Posting API publisher.
//!
//! Submission is three calls: `/video/init/` (returns an upload URL and a
//! video id), a `PUT` of the raw bytes to that URL, then `/video/create/`
//! which starts processing and returns the publish id that is polled via
//! `/video/query/`.

use async_trait::async_trait;
use reelpost_http::{HttpClient, RequestOptions};
use reelpost_models::{Platform, PostMetadata, StagedMedia};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::credentials::{env_credential, require};
use crate::error::{PlatformError, PlatformResult};
use crate::publisher::{ensure_supported, load_media_bytes, PlatformPublisher, StatusCheck};

pub const DEFAULT_API_URL: &str = "https://open.tiktokapis.com/v2";

/// Title used when a post has no caption.
const DEFAULT_TITLE: &str = "New video";

/// TikTok configuration.
#[derive(Debug, Clone)]
pub struct TikTokConfig {
    pub access_token: Option<String>,
    pub open_id: Option<String>,
    pub privacy_level: String,
    pub api_url: String,
}

impl Default for TikTokConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            open_id: None,
            privacy_level: "public".to_string(),
            api_url: DEFAULT_API_URL.to_string(),
        }
    }
}

impl TikTokConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            access_token: env_credential("TIKTOK_ACCESS_TOKEN"),
            open_id: env_credential("TIKTOK_OPEN_ID"),
            privacy_level: std::env::var("TIKTOK_PRIVACY_LEVEL")
                .unwrap_or_else(|_| "public".to_string()),
            ..Default::default()
        }
    }
}

/// TikTok publisher.
pub struct TikTokPublisher {
    http: HttpClient,
    config: TikTokConfig,
}

impl TikTokPublisher {
    pub fn new(http: HttpClient, config: TikTokConfig) -> Self {
        Self { http, config }
    }

    fn access_token(&self) -> PlatformResult<&str> {
        let token = require(Platform::TikTok, "TIKTOK_ACCESS_TOKEN", &self.config.access_token)?;
        require(Platform::TikTok, "TIKTOK_OPEN_ID", &self.config.open_id)?;
        Ok(token)
    }

    fn post_info(&self, metadata: &PostMetadata) -> Value {
        json!({
            "title": metadata.caption_or(DEFAULT_TITLE),
            "privacy_level": self.config.privacy_level,
            "disable_duet": false,
            "disable_comment": false,
            "disable_stitch": false,
            "video_cover_timestamp_ms": 0,
        })
    }

    async fn call(&self, endpoint: &str, operation: &str, body: Value) -> PlatformResult<Value> {
        let url = format!("{}{}", self.config.api_url, endpoint);
        let options = RequestOptions::post(operation)
            .bearer(self.access_token()?)
            .json(body);
        let response = self.http.request(&url, &options).await?;
        check_envelope(&response)?;
        Ok(response)
    }
}

/// TikTok reports some failures in a 200 body as `{"error": {"code": ...}}`.
fn check_envelope(body: &Value) -> PlatformResult<()> {
    match body.pointer("/error/code").and_then(Value::as_str) {
        None | Some("ok") | Some("") => Ok(()),
        Some(code) => {
            let message = body
                .pointer("/error/message")
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty())
                .unwrap_or(code);
            Err(PlatformError::unexpected(format!("TikTok error {}: {}", code, message)))
        }
    }
}

fn data_str(body: &Value, field: &str) -> Option<String> {
    body.get("data")?.get(field)?.as_str().map(str::to_string)
}

#[async_trait]
impl PlatformPublisher for TikTokPublisher {
    fn platform(&self) -> Platform {
        Platform::TikTok
    }

    fn check_credentials(&self) -> PlatformResult<()> {
        self.access_token().map(|_| ())
    }

    async fn submit(&self, media: &StagedMedia, metadata: &PostMetadata) -> PlatformResult<String> {
        ensure_supported(self, media.kind)?;
        let token = self.access_token()?.to_string();
        let data = load_media_bytes(&self.http, media).await?;
        let size = data.len();

        let init = self
            .call(
                "/video/init/",
                "tiktok.init",
                json!({
                    "post_info": self.post_info(metadata),
                    "source_info": {
                        "source": "FILE_UPLOAD",
                        "video_size": size,
                        "chunk_size": size,
                        "total_chunk_count": 1,
                    }
                }),
            )
            .await
            .map_err(|e| PlatformError::submission(e.detail()))?;

        let upload_url = data_str(&init, "upload_url").ok_or_else(|| {
            PlatformError::submission(format!("upload_url missing in init response: {}", init))
        })?;
        let video_id = data_str(&init, "video_id").ok_or_else(|| {
            PlatformError::submission(format!("video_id missing in init response: {}", init))
        })?;

        debug!(video_id = %video_id, bytes = size, "Uploading video to TikTok");
        let upload = RequestOptions::put("tiktok.upload")
            .bearer(token)
            .header("Content-Range", format!("bytes 0-{}/{}", size - 1, size))
            .bytes(data, "video/mp4");
        self.http
            .request(&upload_url, &upload)
            .await
            .map_err(|e| PlatformError::submission(e.to_string()))?;

        let created = self
            .call(
                "/video/create/",
                "tiktok.create",
                json!({
                    "video_id": video_id,
                    "post_info": self.post_info(metadata),
                }),
            )
            .await
            .map_err(|e| PlatformError::submission(e.detail()))?;

        let publish_id = data_str(&created, "publish_id").ok_or_else(|| {
            PlatformError::submission(format!(
                "publish_id missing in create response: {}",
                created
            ))
        })?;

        info!(video_id = %video_id, publish_id = %publish_id, "Created TikTok post");
        Ok(publish_id)
    }

    async fn check_status(&self, job_id: &str) -> PlatformResult<StatusCheck> {
        let body = self
            .call(
                "/video/query/",
                "tiktok.query",
                json!({
                    "fields": ["publish_id", "status"],
                    "publish_ids": [job_id],
                }),
            )
            .await?;

        let video = body.pointer("/data/videos/0");
        let status = video
            .and_then(|v| v.get("status"))
            .and_then(Value::as_str)
            .unwrap_or("PENDING")
            .to_string();
        debug!(publish_id = %job_id, status = %status, "TikTok publish status");

        Ok(match status.as_str() {
            "PUBLISHED" => StatusCheck::Finished,
            "FAILED" => StatusCheck::Failed {
                detail: video
                    .and_then(|v| v.get("fail_reason"))
                    .and_then(Value::as_str)
                    .map(str::to_string),
                status,
            },
            _ => StatusCheck::Processing(status),
        })
    }

    async fn finalize(&self, job_id: &str) -> PlatformResult<String> {
        Ok(job_id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelpost_http::RetryConfig;
    use reelpost_models::{AssetId, MediaKind};
    use tempfile::TempDir;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn publisher(server: &MockServer) -> TikTokPublisher {
        TikTokPublisher::new(
            HttpClient::new(RetryConfig::fast(1)).unwrap(),
            TikTokConfig {
                access_token: Some("act".into()),
                open_id: Some("oid".into()),
                api_url: server.uri(),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_envelope_errors() {
        let ok = json!({"data": {}, "error": {"code": "ok", "message": ""}});
        assert!(check_envelope(&ok).is_ok());
        assert!(check_envelope(&json!({"data": {}})).is_ok());
        let spam = json!({"error": {"code": "spam_risk_too_many_posts", "message": ""}});
        let err = check_envelope(&spam).unwrap_err();
        assert!(err.to_string().contains("spam_risk_too_many_posts"));
    }

    #[test]
    fn test_open_id_required() {
        let publisher = TikTokPublisher::new(
            HttpClient::new(RetryConfig::fast(1)).unwrap(),
            TikTokConfig {
                access_token: Some("act".into()),
                ..Default::default()
            },
        );
        assert!(publisher.check_credentials().unwrap_err().is_config_error());
    }

    #[tokio::test]
    async fn test_submit_init_upload_create() {
        let server = MockServer::start().await;
        let upload_url = format!("{}/upload/abc", server.uri());

        Mock::given(method("POST"))
            .and(path("/video/init/"))
            .and(header("authorization", "Bearer act"))
            .and(body_partial_json(
                json!({"source_info": {"source": "FILE_UPLOAD", "video_size": 5}}),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"upload_url": upload_url, "video_id": "v-1"},
                "error": {"code": "ok", "message": ""}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/upload/abc"))
            .and(header("content-type", "video/mp4"))
            .and(header("content-range", "bytes 0-4/5"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/video/create/"))
            .and(body_partial_json(json!({"video_id": "v-1", "post_info": {"title": "hi"}})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"data": {"publish_id": "p-1"}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let local = dir.path().join("v.mp4");
        tokio::fs::write(&local, b"VIDEO").await.unwrap();
        let media = StagedMedia {
            asset_id: AssetId::from_source("v"),
            public_url: "unused".into(),
            local_path: Some(local),
            kind: MediaKind::Video,
            mime_type: "video/mp4".into(),
        };
        let metadata = PostMetadata {
            caption: Some("hi".into()),
            kind: MediaKind::Video,
        };

        let publish_id = publisher(&server).submit(&media, &metadata).await.unwrap();
        assert_eq!(publish_id, "p-1");
    }

    #[tokio::test]
    async fn test_init_envelope_error_is_submission_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/video/init/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": {"code": "access_token_invalid", "message": "The access token is invalid"}
            })))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let local = dir.path().join("v.mp4");
        tokio::fs::write(&local, b"VIDEO").await.unwrap();
        let media = StagedMedia {
            asset_id: AssetId::from_source("v"),
            public_url: "unused".into(),
            local_path: Some(local),
            kind: MediaKind::Video,
            mime_type: "video/mp4".into(),
        };

        let err = publisher(&server).submit(&media, &PostMetadata::default()).await.unwrap_err();
        assert!(matches!(
            err,
            PlatformError::Submission(ref m) if m.contains("The access token is invalid")
        ));
    }

    #[tokio::test]
    async fn test_status_vocabulary() {
        let cases = [
            (
                json!({"data": {"videos": [{"publish_id": "p", "status": "PUBLISHED"}]}}),
                StatusCheck::Finished,
            ),
            (
                json!({"data": {"videos": [{"status": "FAILED", "fail_reason": "duration"}]}}),
                StatusCheck::Failed {
                    status: "FAILED".into(),
                    detail: Some("duration".into()),
                },
            ),
            (
                json!({"data": {"videos": [{"status": "PROCESSING_UPLOAD"}]}}),
                StatusCheck::Processing("PROCESSING_UPLOAD".into()),
            ),
            (json!({"data": {"videos": []}}), StatusCheck::Processing("PENDING".into())),
        ];

        for (body, expected) in cases {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/video/query/"))
                .and(body_partial_json(json!({"publish_ids": ["p"]})))
                .respond_with(ResponseTemplate::new(200).set_body_json(body))
                .mount(&server)
                .await;

            assert_eq!(publisher(&server).check_status("p").await.unwrap(), expected);
        }
    }
}
