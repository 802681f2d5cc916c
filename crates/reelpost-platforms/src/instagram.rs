//! Instagram Graph API publisher.
//!
//! Flow: create a media container (`/{ig-user}/media`), wait for its
//! `status_code` to reach `FINISHED`, then publish it
//! (`/{ig-user}/media_publish`). A container already reported as `PUBLISHED`
//! is not published a second time.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use reelpost_http::{HttpClient, RequestOptions};
use reelpost_models::{MediaKind, Platform, PostMetadata, StagedMedia};
use serde_json::Value;
use tracing::{debug, info};

use crate::credentials::{env_credential, require};
use crate::error::{PlatformError, PlatformResult};
use crate::publisher::{ensure_supported, PlatformPublisher, StatusCheck};

pub const DEFAULT_GRAPH_API_URL: &str = "https://graph.facebook.com/v23.0";

/// Instagram configuration.
#[derive(Debug, Clone)]
pub struct InstagramConfig {
    pub access_token: Option<String>,
    pub business_account_id: Option<String>,
    pub graph_api_url: String,
}

impl Default for InstagramConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            business_account_id: None,
            graph_api_url: DEFAULT_GRAPH_API_URL.to_string(),
        }
    }
}

impl InstagramConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            access_token: env_credential("FACEBOOK_ACCESS_TOKEN"),
            business_account_id: env_credential("IG_BUSINESS_ACCOUNT_ID"),
            graph_api_url: std::env::var("INSTAGRAM_GRAPH_API_URL")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_GRAPH_API_URL.to_string()),
        }
    }
}

/// Instagram Reels / photo publisher.
pub struct InstagramPublisher {
    http: HttpClient,
    config: InstagramConfig,
    /// Containers whose status came back `PUBLISHED`
    published: Mutex<HashSet<String>>,
}

impl InstagramPublisher {
    pub fn new(http: HttpClient, config: InstagramConfig) -> Self {
        Self {
            http,
            config,
            published: Mutex::new(HashSet::new()),
        }
    }

    fn credentials(&self) -> PlatformResult<(&str, &str)> {
        let token = require(
            Platform::Instagram,
            "FACEBOOK_ACCESS_TOKEN",
            &self.config.access_token,
        )?;
        let account = require(
            Platform::Instagram,
            "IG_BUSINESS_ACCOUNT_ID",
            &self.config.business_account_id,
        )?;
        Ok((token, account))
    }
}

#[async_trait]
impl PlatformPublisher for InstagramPublisher {
    fn platform(&self) -> Platform {
        Platform::Instagram
    }

    fn check_credentials(&self) -> PlatformResult<()> {
        self.credentials().map(|_| ())
    }

    fn supports(&self, _kind: MediaKind) -> bool {
        true
    }

    async fn submit(&self, media: &StagedMedia, metadata: &PostMetadata) -> PlatformResult<String> {
        ensure_supported(self, media.kind)?;
        let (token, account) = self.credentials()?;

        let caption = metadata.caption.clone().unwrap_or_default();
        let mut params = vec![
            ("caption", caption),
            ("access_token", token.to_string()),
        ];
        match media.kind {
            MediaKind::Video => {
                params.push(("media_type", "REELS".to_string()));
                params.push(("video_url", media.public_url.clone()));
                params.push(("share_to_feed", "true".to_string()));
            }
            MediaKind::Photo => {
                params.push(("image_url", media.public_url.clone()));
            }
        }

        let url = format!("{}/{}/media", self.config.graph_api_url, account);
        let options = RequestOptions::post("instagram.create_container").form(params);
        let body = self
            .http
            .request(&url, &options)
            .await
            .map_err(|e| PlatformError::submission(e.to_string()))?;

        let container_id = string_field(&body, "id").ok_or_else(|| {
            PlatformError::submission(format!("container id missing in response: {}", body))
        })?;

        info!(
            container_id = %container_id,
            kind = media.kind.as_str(),
            "Created Instagram media container"
        );
        Ok(container_id)
    }

    async fn check_status(&self, job_id: &str) -> PlatformResult<StatusCheck> {
        let (token, _) = self.credentials()?;

        let url = format!("{}/{}", self.config.graph_api_url, job_id);
        let options = RequestOptions::get("instagram.container_status")
            .query("fields", "status_code,status")
            .query("access_token", token);
        let body = self.http.request(&url, &options).await?;

        let status_code = string_field(&body, "status_code").ok_or_else(|| {
            PlatformError::status_check(format!("status_code missing in response: {}", body))
        })?;
        let detail = string_field(&body, "status");
        debug!(container_id = %job_id, status_code = %status_code, "Instagram container status");

        Ok(match status_code.as_str() {
            "FINISHED" => StatusCheck::Finished,
            "PUBLISHED" => {
                self.published
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .insert(job_id.to_string());
                StatusCheck::Finished
            }
            "ERROR" => StatusCheck::Failed {
                status: status_code,
                detail,
            },
            "EXPIRED" => StatusCheck::Expired { detail },
            _ => StatusCheck::Processing(status_code),
        })
    }

    async fn finalize(&self, job_id: &str) -> PlatformResult<String> {
        let (token, account) = self.credentials()?;

        let already_published = self
            .published
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(job_id);
        if already_published {
            info!(container_id = %job_id, "Instagram container already published");
            return Ok(job_id.to_string());
        }

        let url = format!("{}/{}/media_publish", self.config.graph_api_url, account);
        let options = RequestOptions::post("instagram.media_publish")
            .form([("creation_id", job_id), ("access_token", token)]);
        let body = self
            .http
            .request(&url, &options)
            .await
            .map_err(|e| PlatformError::finalization(e.to_string()))?;

        let media_id = string_field(&body, "id").ok_or_else(|| {
            PlatformError::finalization(format!("media id missing in response: {}", body))
        })?;

        info!(container_id = %job_id, media_id = %media_id, "Published Instagram media");
        Ok(media_id)
    }
}

/// Read a field that may be encoded as a JSON string or number.
pub(crate) fn string_field(body: &Value, field: &str) -> Option<String> {
    match body.get(field)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
