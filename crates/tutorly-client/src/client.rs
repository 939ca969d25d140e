// HTTP client wrapper for the Tutorly API
//
// An authenticated client asks the session for a fresh credential before
// every request and turns authorization failures into navigation:
// 403 goes to /forbidden, 401 signs out and goes to /login. The caller
// still gets the error either way.

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::{Arc, Weak};
use url::Url;

use tutorly_core::{AuthError, Error, Navigator, Redirect, Result, SessionProvider};

use crate::config::ClientConfig;

/// Build the shared reqwest client
pub fn http_client(config: &ClientConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()
        .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))
}

/// Percent-encode one path segment (emails, ids)
pub fn segment(value: &str) -> String {
    let Ok(mut url) = Url::parse("http://segment.local/") else {
        return query_value(value);
    };
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.clear().push(value);
    }
    url.path().trim_start_matches('/').to_string()
}

/// Form-encode one query value
pub fn query_value(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

#[derive(Clone)]
struct AuthContext {
    session: Weak<SessionProvider>,
    navigator: Arc<dyn Navigator>,
}

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    auth: Option<AuthContext>,
}

impl ApiClient {
    /// Client that never sends credentials
    pub fn public(config: &ClientConfig) -> Result<Self> {
        Ok(Self::from_parts(&config.api_url, http_client(config)?, None))
    }

    /// Client that authenticates as the session's identity
    pub fn authenticated(
        config: &ClientConfig,
        session: &Arc<SessionProvider>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        Ok(Self::with_session(
            &config.api_url,
            http_client(config)?,
            Arc::downgrade(session),
            navigator,
        ))
    }

    /// Authenticated client holding only a weak reference to the session
    ///
    /// Used for the directory the session itself owns.
    pub fn with_session(
        base_url: &str,
        http: reqwest::Client,
        session: Weak<SessionProvider>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self::from_parts(base_url, http, Some(AuthContext { session, navigator }))
    }

    fn from_parts(base_url: &str, http: reqwest::Client, auth: Option<AuthContext>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            auth,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth.is_some()
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.execute(Method::GET, path, None::<&()>).await?;
        decode(response).await
    }

    /// GET that maps 404 to `None`
    pub async fn get_opt<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        match self.execute(Method::GET, path, None::<&()>).await {
            Ok(response) => decode(response).await.map(Some),
            Err(Error::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let response = self.execute(Method::POST, path, Some(body)).await?;
        decode(response).await
    }

    /// POST whose response body is ignored
    pub async fn post_unit<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
        self.execute(Method::POST, path, Some(body)).await?;
        Ok(())
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self.execute(Method::PATCH, path, Some(body)).await?;
        decode(response).await
    }

    /// PATCH whose response body is ignored
    pub async fn patch_unit<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
        self.execute(Method::PATCH, path, Some(body)).await?;
        Ok(())
    }

    pub async fn put<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let response = self.execute(Method::PUT, path, Some(body)).await?;
        decode(response).await
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        self.execute(Method::DELETE, path, None::<&()>).await?;
        Ok(())
    }

    async fn execute<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Response> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.request(method.clone(), &url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let request = self.authorize(path, request).await?;
        tracing::debug!(method = %method, path = %path, "Sending request");

        let response = request.send().await.map_err(|e| {
            tracing::warn!(method = %method, path = %path, "Request failed: {}", e);
            Error::network(e.to_string())
        })?;

        self.check(path, response).await
    }

    /// Attach a fresh credential when someone is signed in
    ///
    /// A session the provider no longer accepts is handled like a 401.
    async fn authorize(&self, path: &str, request: RequestBuilder) -> Result<RequestBuilder> {
        let Some(session) = self.auth.as_ref().and_then(|a| a.session.upgrade()) else {
            return Ok(request);
        };

        match session.credential().await {
            Ok(Some(credential)) => Ok(request.bearer_auth(credential.token())),
            Ok(None) => Ok(request),
            Err(Error::Auth(AuthError::SessionInvalid)) => {
                tracing::warn!(path = %path, "Credential refused by auth provider");
                Err(self.session_expired(path).await)
            }
            Err(e) => Err(e),
        }
    }

    /// Sign out, send the user to /login and build the error for the caller
    async fn session_expired(&self, path: &str) -> Error {
        if let Some(auth) = &self.auth {
            if let Some(session) = auth.session.upgrade() {
                if let Err(e) = session.sign_out().await {
                    tracing::warn!("Sign-out after expired session failed: {}", e);
                }
            }
            auth.navigator.navigate(Redirect::login(path));
        }
        Error::SessionExpired {
            path: path.to_string(),
        }
    }

    async fn check(&self, path: &str, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        match status {
            StatusCode::FORBIDDEN => {
                tracing::warn!(path = %path, "Access forbidden");
                if let Some(auth) = &self.auth {
                    auth.navigator.navigate(Redirect::forbidden(path));
                }
                Err(Error::Forbidden {
                    path: path.to_string(),
                })
            }
            StatusCode::UNAUTHORIZED => {
                tracing::warn!(path = %path, "Session expired");
                Err(self.session_expired(path).await)
            }
            StatusCode::NOT_FOUND => Err(Error::NotFound),
            _ => {
                let message = response.text().await.unwrap_or_default();
                Err(Error::Api {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    response
        .json()
        .await
        .map_err(|e| Error::Internal(anyhow::Error::new(e).context("Failed to decode response")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_encoding() {
        assert_eq!(segment("student@example.com"), "student@example.com");
        assert_eq!(segment("abc123"), "abc123");
        assert_eq!(segment("a/b"), "a%2Fb");
        assert_eq!(segment("intro to rust"), "intro%20to%20rust");
        assert_eq!(segment("a+b?c#d"), "a+b%3Fc%23d");
    }

    #[test]
    fn test_query_value_encoding() {
        assert_eq!(query_value("ada lovelace"), "ada+lovelace");
        assert_eq!(query_value("a&b=c"), "a%26b%3Dc");
    }

    #[test]
    fn test_public_client_trims_base_url() {
        let config = ClientConfig::default().with_api_url("http://localhost:5000/");
        let client = ApiClient::public(&config).unwrap();
        assert_eq!(client.base_url(), "http://localhost:5000");
        assert!(!client.is_authenticated());
    }
}
