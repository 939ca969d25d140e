// Auth provider backed by the Tutorly token service
//
// Decision: Tokens live inside the provider only; callers get a fresh
// Credential per request via `credential()`
// Decision: The refresh token (never the access token) may be persisted to a
// session file so a sign-in survives restarts
// Decision: The first subscriber triggers restore; later subscribers see the
// current identity

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use futures::StreamExt;
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::{watch, Mutex, OnceCell};
use tokio_stream::wrappers::WatchStream;

use tutorly_core::{AuthError, AuthProvider, Credential, Identity, IdentityChanges, ProfileUpdate};

use crate::config::ClientConfig;

type AuthResult<T> = std::result::Result<T, AuthError>;

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    email: &'a str,
    password: &'a str,
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Default, Serialize)]
struct UpdateMeRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    avatar_url: Option<&'a str>,
}

/// Token pair issued by the token service
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Current user as reported by `/v1/auth/me`
#[derive(Debug, Clone, Deserialize)]
pub struct UserInfoResponse {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl From<UserInfoResponse> for Identity {
    fn from(info: UserInfoResponse) -> Self {
        let mut identity = Identity::new(info.id, info.email);
        if !info.name.is_empty() {
            identity.display_name = Some(info.name);
        }
        identity.photo_url = info.avatar_url;
        identity
    }
}

/// What survives a restart
#[derive(Debug, Serialize, Deserialize)]
struct PersistedSession {
    identity: Identity,
    refresh_token: String,
}

#[derive(Debug, Clone)]
struct Tokens {
    access_token: String,
    refresh_token: Option<String>,
    expires_at: DateTime<Utc>,
}

impl Tokens {
    fn from_response(response: TokenResponse, previous_refresh: Option<String>) -> Self {
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token.or(previous_refresh),
            expires_at: Utc::now() + ChronoDuration::seconds(response.expires_in),
        }
    }

    fn expires_within(&self, skew: Duration) -> bool {
        let skew = ChronoDuration::from_std(skew).unwrap_or_else(|_| ChronoDuration::zero());
        self.expires_at - skew <= Utc::now()
    }
}

// ============================================================================
// HttpAuthProvider
// ============================================================================

struct Inner {
    base_url: String,
    http: reqwest::Client,
    state: watch::Sender<Option<Identity>>,
    tokens: Mutex<Option<Tokens>>,
    session_file: Option<PathBuf>,
    refresh_skew: Duration,
    restored: OnceCell<AuthResult<()>>,
}

/// Auth provider speaking the `/v1/auth/*` token service
#[derive(Clone)]
pub struct HttpAuthProvider {
    inner: Arc<Inner>,
}

impl HttpAuthProvider {
    pub fn new(config: &ClientConfig, http: reqwest::Client) -> Self {
        let (state, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                base_url: config.auth_url.trim_end_matches('/').to_string(),
                http,
                state,
                tokens: Mutex::new(None),
                session_file: config.session_file.clone(),
                refresh_skew: config.token_refresh_skew,
                restored: OnceCell::new(),
            }),
        }
    }

    /// Identity as last published
    pub fn current(&self) -> Option<Identity> {
        self.inner.state.borrow().clone()
    }
}

#[async_trait]
impl AuthProvider for HttpAuthProvider {
    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<Identity> {
        let response = self
            .inner
            .post("/v1/auth/login", &LoginRequest { email, password }, None)
            .await?;

        let tokens = match response.status() {
            s if s.is_success() => Tokens::from_response(parse(response).await?, None),
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                return Err(AuthError::InvalidCredentials)
            }
            _ => return Err(status_error(response).await),
        };

        self.inner.establish(tokens).await
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        profile: &ProfileUpdate,
    ) -> AuthResult<Identity> {
        let name = profile
            .display_name
            .as_deref()
            .unwrap_or_else(|| email.split('@').next().unwrap_or(email));
        let request = RegisterRequest {
            email,
            password,
            name,
        };
        let response = self.inner.post("/v1/auth/register", &request, None).await?;

        let tokens = match response.status() {
            s if s.is_success() => Tokens::from_response(parse(response).await?, None),
            StatusCode::CONFLICT => return Err(AuthError::EmailInUse(email.to_string())),
            _ => return Err(status_error(response).await),
        };

        let access_token = tokens.access_token.clone();
        let identity = self.inner.establish(tokens).await?;
        let Some(photo_url) = profile.photo_url.as_deref() else {
            return Ok(identity);
        };

        // The token service takes the avatar only through /me; the account
        // exists by now, so a failed avatar update keeps the identity
        let update = UpdateMeRequest {
            name: None,
            avatar_url: Some(photo_url),
        };
        match self.inner.update_me(&access_token, &update).await {
            Ok(updated) => {
                self.inner.publish(updated.clone()).await;
                Ok(updated)
            }
            Err(e) => {
                tracing::warn!(email = %identity.email, "Avatar update after registration failed: {}", e);
                Ok(identity)
            }
        }
    }

    async fn sign_out(&self) -> AuthResult<()> {
        let tokens = self.inner.tokens.lock().await.take();

        if let Some(tokens) = tokens {
            let url = format!("{}/v1/auth/logout", self.inner.base_url);
            let result = self
                .inner
                .http
                .post(&url)
                .bearer_auth(&tokens.access_token)
                .send()
                .await;
            // Local state is cleared regardless
            match result {
                Ok(response) if !response.status().is_success() => {
                    tracing::warn!(status = %response.status(), "Token service rejected logout");
                }
                Err(e) => tracing::warn!("Logout request failed: {}", e),
                Ok(_) => {}
            }
        }

        self.inner.forget().await;
        Ok(())
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> AuthResult<Identity> {
        let current = self.current().ok_or(AuthError::NotSignedIn)?;
        let access_token = self.inner.access_token(&current).await?;

        let request = UpdateMeRequest {
            name: update.display_name.as_deref(),
            avatar_url: update.photo_url.as_deref(),
        };
        let identity = self.inner.update_me(&access_token, &request).await?;
        self.inner.publish(identity.clone()).await;
        Ok(identity)
    }

    fn subscribe(&self) -> IdentityChanges {
        let inner = Arc::clone(&self.inner);

        futures::stream::once(async move {
            let restored = inner
                .restored
                .get_or_init(|| async { inner.restore().await })
                .await
                .clone();

            let mut rx = inner.state.subscribe();
            let initial = restored.map(|()| rx.borrow_and_update().clone());
            futures::stream::once(async move { initial })
                .chain(WatchStream::from_changes(rx).map(Ok))
        })
        .flatten()
        .boxed()
    }

    async fn credential(&self, identity: &Identity) -> AuthResult<Credential> {
        let token = self.inner.access_token(identity).await?;
        Ok(Credential::new(token))
    }
}

impl Inner {
    async fn post<B: Serialize>(
        &self,
        path: &str,
        body: &B,
        bearer: Option<&str>,
    ) -> AuthResult<Response> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.post(&url).json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        request
            .send()
            .await
            .map_err(|e| AuthError::unavailable(e.to_string()))
    }

    async fn me(&self, access_token: &str) -> AuthResult<Identity> {
        let url = format!("{}/v1/auth/me", self.base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::unavailable(e.to_string()))?;

        match response.status() {
            s if s.is_success() => Ok(parse::<UserInfoResponse>(response).await?.into()),
            StatusCode::UNAUTHORIZED => Err(AuthError::SessionInvalid),
            _ => Err(status_error(response).await),
        }
    }

    async fn update_me(&self, access_token: &str, body: &UpdateMeRequest<'_>) -> AuthResult<Identity> {
        let url = format!("{}/v1/auth/me", self.base_url);
        let response = self
            .http
            .patch(&url)
            .bearer_auth(access_token)
            .json(body)
            .send()
            .await
            .map_err(|e| AuthError::unavailable(e.to_string()))?;

        match response.status() {
            s if s.is_success() => Ok(parse::<UserInfoResponse>(response).await?.into()),
            StatusCode::UNAUTHORIZED => Err(AuthError::SessionInvalid),
            _ => Err(status_error(response).await),
        }
    }

    async fn refresh(&self, refresh_token: &str) -> AuthResult<Tokens> {
        let response = self
            .post("/v1/auth/refresh", &RefreshRequest { refresh_token }, None)
            .await?;

        match response.status() {
            s if s.is_success() => Ok(Tokens::from_response(
                parse(response).await?,
                Some(refresh_token.to_string()),
            )),
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => Err(AuthError::SessionInvalid),
            _ => Err(status_error(response).await),
        }
    }

    /// Look up the identity for fresh tokens, keep them and publish
    async fn establish(&self, tokens: Tokens) -> AuthResult<Identity> {
        let identity = self.me(&tokens.access_token).await?;
        *self.tokens.lock().await = Some(tokens);
        self.publish(identity.clone()).await;
        Ok(identity)
    }

    async fn publish(&self, identity: Identity) {
        self.persist(&identity).await;
        self.state.send_replace(Some(identity));
    }

    async fn forget(&self) {
        *self.tokens.lock().await = None;
        if let Some(path) = &self.session_file {
            match tokio::fs::remove_file(path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(path = %path.display(), "Failed to remove session file: {}", e),
            }
        }
        self.state.send_replace(None);
    }

    /// Access token for `identity`, refreshed when close to expiry
    async fn access_token(&self, identity: &Identity) -> AuthResult<String> {
        let current_uid = self.state.borrow().as_ref().map(|i| i.uid.clone());
        if current_uid.as_deref() != Some(identity.uid.as_str()) {
            return Err(AuthError::SessionInvalid);
        }

        let mut guard = self.tokens.lock().await;
        let tokens = guard.as_ref().ok_or(AuthError::SessionInvalid)?;
        if !tokens.expires_within(self.refresh_skew) {
            return Ok(tokens.access_token.clone());
        }

        let Some(refresh_token) = tokens.refresh_token.clone() else {
            return Err(AuthError::SessionInvalid);
        };

        tracing::debug!("Refreshing access token");
        match self.refresh(&refresh_token).await {
            Ok(fresh) => {
                let access_token = fresh.access_token.clone();
                let rotated = fresh.refresh_token.clone();
                *guard = Some(fresh);
                drop(guard);
                if rotated.as_deref() != Some(refresh_token.as_str()) {
                    self.persist(identity).await;
                }
                Ok(access_token)
            }
            Err(AuthError::SessionInvalid) => {
                tracing::warn!("Refresh token rejected; clearing session");
                drop(guard);
                self.forget().await;
                Err(AuthError::SessionInvalid)
            }
            Err(e) => Err(e),
        }
    }

    /// Bring back a persisted session, validating it with a refresh
    async fn restore(&self) -> AuthResult<()> {
        let Some(path) = &self.session_file else {
            return Ok(());
        };

        let Some(persisted) = read_session(path).await else {
            return Ok(());
        };

        let tokens = match self.refresh(&persisted.refresh_token).await {
            Ok(tokens) => tokens,
            Err(AuthError::SessionInvalid) => {
                tracing::info!(email = %persisted.identity.email, "Persisted session expired");
                self.forget().await;
                return Ok(());
            }
            Err(e) => {
                tracing::warn!("Could not restore session: {}", e);
                return Err(e);
            }
        };

        match self.establish(tokens).await {
            Ok(identity) => {
                tracing::debug!(email = %identity.email, "Session restored");
                Ok(())
            }
            Err(AuthError::SessionInvalid) => {
                self.forget().await;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn persist(&self, identity: &Identity) {
        let Some(path) = &self.session_file else {
            return;
        };
        let refresh_token = self
            .tokens
            .lock()
            .await
            .as_ref()
            .and_then(|t| t.refresh_token.clone());
        let Some(refresh_token) = refresh_token else {
            return;
        };

        let session = PersistedSession {
            identity: identity.clone(),
            refresh_token,
        };
        if let Err(e) = write_session(path, &session).await {
            tracing::warn!(path = %path.display(), "Failed to persist session: {}", e);
        }
    }
}

async fn read_session(path: &Path) -> Option<PersistedSession> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!(path = %path.display(), "Failed to read session file: {}", e);
            return None;
        }
    };

    match serde_json::from_str(&content) {
        Ok(session) => Some(session),
        Err(e) => {
            tracing::warn!(path = %path.display(), "Ignoring corrupt session file: {}", e);
            None
        }
    }
}

async fn write_session(path: &Path, session: &PersistedSession) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let content = serde_json::to_vec_pretty(session)?;

    // Written next to the target and renamed over it, owner-only from creation
    let staging = path.with_extension("tmp");
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(&staging).await?;
    file.write_all(&content).await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(&staging, path).await
}

async fn parse<T: serde::de::DeserializeOwned>(response: Response) -> AuthResult<T> {
    response
        .json()
        .await
        .map_err(|e| AuthError::unavailable(format!("Malformed token service response: {}", e)))
}

async fn status_error(response: Response) -> AuthError {
    let status = response.status();
    let message = response.text().await.unwrap_or_default();
    if status.is_server_error() {
        AuthError::unavailable(format!("{}: {}", status, message))
    } else {
        AuthError::rejected(if message.is_empty() {
            status.to_string()
        } else {
            message
        })
    }
}
