//! Platform configuration and publisher construction.

use std::sync::Arc;

use reelpost_http::HttpClient;
use reelpost_models::Platform;

use crate::instagram::{InstagramConfig, InstagramPublisher};
use crate::publisher::PlatformPublisher;
use crate::tiktok::{TikTokConfig, TikTokPublisher};
use crate::youtube::{YouTubeConfig, YouTubePublisher};

/// Configuration for every supported platform.
#[derive(Debug, Clone, Default)]
pub struct PlatformsConfig {
    pub instagram: InstagramConfig,
    pub youtube: YouTubeConfig,
    pub tiktok: TikTokConfig,
}

impl PlatformsConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            instagram: InstagramConfig::from_env(),
            youtube: YouTubeConfig::from_env(),
            tiktok: TikTokConfig::from_env(),
        }
    }

    /// Build the publisher for one platform.
    ///
    /// Construction never fails; credentials are checked when publishing.
    pub fn build_publisher(
        &self,
        platform: Platform,
        http: HttpClient,
    ) -> Arc<dyn PlatformPublisher> {
        match platform {
            Platform::Instagram => Arc::new(InstagramPublisher::new(http, self.instagram.clone())),
            Platform::YouTube => Arc::new(YouTubePublisher::new(http, self.youtube.clone())),
            Platform::TikTok => Arc::new(TikTokPublisher::new(http, self.tiktok.clone())),
        }
    }

    pub fn build_publishers(
        &self,
        platforms: &[Platform],
        http: &HttpClient,
    ) -> Vec<Arc<dyn PlatformPublisher>> {
        platforms
            .iter()
            .map(|p| self.build_publisher(*p, http.clone()))
            .collect()
    }
}
