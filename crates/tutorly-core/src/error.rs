// Error types for the marketplace client
//
// Auth and validation errors are handled by whoever triggered them.
// Forbidden and SessionExpired are produced by the request client after it
// has already redirected; callers only need them to stop work.

use thiserror::Error;

use crate::identity::Identity;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by the auth provider
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Wrong email or password
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Registration with an email that already has an identity
    #[error("Email already in use: {0}")]
    EmailInUse(String),

    /// Provider rejected the request for another reason
    #[error("Auth provider rejected the request: {0}")]
    Rejected(String),

    /// Operation needs a signed-in identity
    #[error("No signed-in user")]
    NotSignedIn,

    /// The provider's session is no longer valid
    #[error("Session is no longer valid")]
    SessionInvalid,

    /// Provider outage or transport failure
    #[error("Auth provider unavailable: {0}")]
    Unavailable(String),
}

impl AuthError {
    pub fn rejected(msg: impl Into<String>) -> Self {
        AuthError::Rejected(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        AuthError::Unavailable(msg.into())
    }
}

/// Form-level validation failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Errors that can occur while talking to the auth provider or the API
#[derive(Debug, Error)]
pub enum Error {
    /// Authentication failed
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// API answered 403
    #[error("Access forbidden: {path}")]
    Forbidden { path: String },

    /// API answered 401
    #[error("Session expired: {path}")]
    SessionExpired { path: String },

    /// Input rejected before sending
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Transport failure
    #[error("Network error: {0}")]
    Network(String),

    /// Identity was created or updated but the remote user record was not
    #[error("User record sync failed for {}: {message}", identity.email)]
    UserRecordSync {
        identity: Box<Identity>,
        message: String,
    },

    /// Any other non-success status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Not found")]
    NotFound,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl Error {
    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        Error::Network(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    /// Create a user record sync error
    pub fn record_sync(identity: Identity, msg: impl Into<String>) -> Self {
        Error::UserRecordSync {
            identity: Box::new(identity),
            message: msg.into(),
        }
    }

    /// Whether the request client already redirected for this error
    pub fn redirected(&self) -> bool {
        matches!(self, Error::Forbidden { .. } | Error::SessionExpired { .. })
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Forbidden { .. } => Some(403),
            Error::SessionExpired { .. } => Some(401),
            Error::NotFound => Some(404),
            Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirected_errors() {
        assert!(Error::Forbidden { path: "/x".into() }.redirected());
        assert!(Error::SessionExpired { path: "/x".into() }.redirected());
        assert!(!Error::NotFound.redirected());
        assert!(!Error::network("down").redirected());
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(Error::Forbidden { path: "/".into() }.status(), Some(403));
        assert_eq!(Error::SessionExpired { path: "/".into() }.status(), Some(401));
        assert_eq!(
            Error::Api {
                status: 500,
                message: "boom".into()
            }
            .status(),
            Some(500)
        );
        assert_eq!(Error::from(AuthError::InvalidCredentials).status(), None);
    }

    #[test]
    fn test_record_sync_message() {
        let err = Error::record_sync(Identity::new("u1", "a@example.com"), "timeout");
        assert_eq!(
            err.to_string(),
            "User record sync failed for a@example.com: timeout"
        );
    }
}
