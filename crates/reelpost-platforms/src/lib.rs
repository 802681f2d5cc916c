//! Platform publishing clients.
//!
//! Each platform implements [`PlatformPublisher`]:
//! - `submit` creates the remote processing job and returns its handle
//! - `check_status` maps the platform's status vocabulary onto [`StatusCheck`]
//! - `finalize` makes a processed job public and returns the media id
//!
//! Supported platforms:
//! - Instagram Reels and photo posts (Graph API containers)
//! - YouTube Shorts (multipart upload, OAuth refresh-token exchange)
//! - TikTok (init, PUT upload, create, query)

pub mod config;
pub mod credentials;
pub mod error;
pub mod instagram;
pub mod publisher;
pub mod tiktok;
pub mod youtube;

pub use config::PlatformsConfig;
pub use credentials::is_placeholder;
pub use error::{PlatformError, PlatformResult};
pub use instagram::{InstagramConfig, InstagramPublisher};
pub use publisher::{PlatformPublisher, StatusCheck};
pub use tiktok::{TikTokConfig, TikTokPublisher};
pub use youtube::{TokenCache, YouTubeConfig, YouTubePublisher};
