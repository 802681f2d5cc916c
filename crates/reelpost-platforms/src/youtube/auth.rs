//! Google OAuth2 refresh-token exchange.
//!
//! The token cache is an explicit value: callers pass in what they hold and
//! get back what they should hold next. Nothing here is process-global.

use std::time::{Duration, Instant};

use reelpost_http::{HttpClient, RequestOptions};
use reelpost_models::Platform;
use serde::Deserialize;
use tracing::debug;

use crate::error::{PlatformError, PlatformResult};

/// Refresh margin: refresh token 60 seconds before expiry.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Lifetime assumed when the token endpoint omits `expires_in`.
const TOKEN_DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Cached access token with expiration tracking.
#[derive(Debug, Clone)]
pub struct TokenCache {
    pub access_token: String,
    pub expires_at: Instant,
}

impl TokenCache {
    /// Check if token is still valid with refresh margin.
    pub fn is_valid(&self) -> bool {
        Instant::now() + TOKEN_REFRESH_MARGIN < self.expires_at
    }
}

/// Long-lived credentials used for the exchange.
#[derive(Debug, Clone, Copy)]
pub struct GoogleCredentials<'a> {
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Return `cached` while it is valid, otherwise exchange the refresh token
/// for a new access token.
pub async fn refresh_access_token(
    http: &HttpClient,
    token_url: &str,
    credentials: GoogleCredentials<'_>,
    cached: Option<TokenCache>,
) -> PlatformResult<TokenCache> {
    if let Some(token) = cached.filter(TokenCache::is_valid) {
        return Ok(token);
    }

    debug!(platform = %Platform::YouTube, "Refreshing Google access token");

    let options = RequestOptions::post("youtube.refresh_token").form([
        ("client_id", credentials.client_id),
        ("client_secret", credentials.client_secret),
        ("refresh_token", credentials.refresh_token),
        ("grant_type", "refresh_token"),
    ]);
    let body = http
        .request(token_url, &options)
        .await
        .map_err(|e| PlatformError::Auth(format!("Failed to refresh Google access token: {}", e)))?;

    let response: TokenResponse = serde_json::from_value(body)
        .map_err(|e| PlatformError::Auth(format!("Invalid token response: {}", e)))?;

    let ttl = response
        .expires_in
        .map(Duration::from_secs)
        .unwrap_or(TOKEN_DEFAULT_TTL);

    Ok(TokenCache {
        access_token: response.access_token,
        expires_at: Instant::now() + ttl,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelpost_http::RetryConfig;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CREDS: GoogleCredentials<'static> = GoogleCredentials {
        client_id: "cid",
        client_secret: "secret",
        refresh_token: "rt",
    };

    fn http() -> HttpClient {
        HttpClient::new(RetryConfig::fast(1)).unwrap()
    }

    #[test]
    fn test_token_validity_margin() {
        let fresh = TokenCache {
            access_token: "a".into(),
            expires_at: Instant::now() + Duration::from_secs(3600),
        };
        assert!(fresh.is_valid());

        let nearly_expired = TokenCache {
            access_token: "a".into(),
            expires_at: Instant::now() + Duration::from_secs(30),
        };
        assert!(!nearly_expired.is_valid());
    }

    #[tokio::test]
    async fn test_valid_cache_skips_exchange() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let cached = TokenCache {
            access_token: "cached".into(),
            expires_at: Instant::now() + Duration::from_secs(3600),
        };
        let token_url = format!("{}/token", server.uri());
        let token = refresh_access_token(&http(), &token_url, CREDS, Some(cached))
            .await
            .unwrap();
        assert_eq!(token.access_token, "cached");
    }

    #[tokio::test]
    async fn test_expired_cache_is_exchanged() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=rt"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "fresh",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let stale = TokenCache {
            access_token: "stale".into(),
            expires_at: Instant::now(),
        };
        let token_url = format!("{}/token", server.uri());
        let token = refresh_access_token(&http(), &token_url, CREDS, Some(stale))
            .await
            .unwrap();
        assert_eq!(token.access_token, "fresh");
        assert!(token.is_valid());
    }

    #[tokio::test]
    async fn test_exchange_failure_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Token has been expired or revoked."
            })))
            .mount(&server)
            .await;

        let err = refresh_access_token(&http(), &server.uri(), CREDS, None).await.unwrap_err();
        match err {
            PlatformError::Auth(msg) => assert!(msg.contains("Token has been expired or revoked.")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
