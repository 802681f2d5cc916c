//! Target platforms.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A short-video platform that media can be published to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Instagram Reels (Graph API)
    Instagram,
    /// YouTube Shorts (Data API v3)
    #[serde(rename = "youtube")]
    YouTube,
    /// TikTok (Content Posting API)
    #[serde(rename = "tiktok")]
    TikTok,
}

impl Platform {
    /// Every supported platform, in the order posts are announced.
    pub const ALL: [Platform; 3] = [Platform::Instagram, Platform::YouTube, Platform::TikTok];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Instagram => "instagram",
            Platform::YouTube => "youtube",
            Platform::TikTok => "tiktok",
        }
    }

    /// Human-facing name used in progress messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Instagram => "Instagram",
            Platform::YouTube => "YouTube Shorts",
            Platform::TikTok => "TikTok",
        }
    }

    /// Parse a comma separated platform list (e.g. `"instagram, tiktok"`).
    ///
    /// Duplicates are dropped while keeping first-seen order.
    pub fn parse_list(s: &str) -> Result<Vec<Platform>, UnknownPlatform> {
        let mut platforms = Vec::new();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let platform: Platform = part.parse()?;
            if !platforms.contains(&platform) {
                platforms.push(platform);
            }
        }
        Ok(platforms)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a platform name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown platform: {0}")]
pub struct UnknownPlatform(pub String);

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "instagram" | "ig" | "reels" => Ok(Platform::Instagram),
            "youtube" | "yt" | "shorts" => Ok(Platform::YouTube),
            "tiktok" | "tt" => Ok(Platform::TikTok),
            other => Err(UnknownPlatform(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_round_trips_through_str() {
        for platform in Platform::ALL {
            assert_eq!(platform.as_str().parse::<Platform>().unwrap(), platform);
        }
    }

    #[test]
    fn test_parse_list_dedups_and_trims() {
        let list = Platform::parse_list(" tiktok, instagram ,TikTok,").unwrap();
        assert_eq!(list, vec![Platform::TikTok, Platform::Instagram]);
    }

    #[test]
    fn test_parse_list_rejects_unknown() {
        let err = Platform::parse_list("instagram,myspace").unwrap_err();
        assert_eq!(err, UnknownPlatform("myspace".to_string()));
    }

    #[test]
    fn test_platform_serde_names() {
        assert_eq!(serde_json::to_string(&Platform::YouTube).unwrap(), "\"youtube\"");
        assert_eq!(serde_json::to_string(&Platform::TikTok).unwrap(), "\"tiktok\"");
        let p: Platform = serde_json::from_str("\"instagram\"").unwrap();
        assert_eq!(p, Platform::Instagram);
    }
}
