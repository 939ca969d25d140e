// Client configuration loaded from environment variables.
// Decision: TUTORLY_ prefix for all client config
// Decision: The auth service defaults to the API host

use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_API_URL: &str = "http://localhost:5000";

/// Complete client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the marketplace API
    pub api_url: String,
    /// Base URL of the token service
    pub auth_url: String,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Where the auth provider keeps its refresh token (not persisted when unset)
    pub session_file: Option<PathBuf>,
    /// Access tokens closer than this to expiry are refreshed before use
    pub token_refresh_skew: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            auth_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            session_file: None,
            token_refresh_skew: Duration::from_secs(60),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let api_url = std::env::var("TUTORLY_API_URL")
            .map(|s| normalize_url(&s))
            .unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        let auth_url = std::env::var("TUTORLY_AUTH_URL")
            .map(|s| normalize_url(&s))
            .unwrap_or_else(|_| api_url.clone());

        let request_timeout = std::env::var("TUTORLY_REQUEST_TIMEOUT")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(30));

        let session_file = std::env::var("TUTORLY_SESSION_FILE")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        let token_refresh_skew = std::env::var("TUTORLY_TOKEN_REFRESH_SKEW")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(60));

        Self {
            api_url,
            auth_url,
            request_timeout,
            session_file,
            token_refresh_skew,
        }
    }

    /// Point both the API and the token service at one host
    pub fn with_api_url(mut self, url: &str) -> Self {
        self.api_url = normalize_url(url);
        self.auth_url = self.api_url.clone();
        self
    }

    pub fn with_auth_url(mut self, url: &str) -> Self {
        self.auth_url = normalize_url(url);
        self
    }

    pub fn with_session_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_file = Some(path.into());
        self
    }
}

fn normalize_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
