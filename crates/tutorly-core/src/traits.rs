// Core traits for pluggable backends
//
// These traits keep the session and guard logic independent of transport:
// - HTTP implementations live in tutorly-client
// - In-memory implementations for examples and testing live in `memory`

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::error::{AuthError, Result};
use crate::identity::{Credential, Identity, ProfileUpdate, UserRecord};

/// Stream of identity changes from an auth provider
///
/// The first item is the provider's initial resolution (restored session or
/// `None`). Dropping the stream unsubscribes.
pub type IdentityChanges =
    Pin<Box<dyn Stream<Item = std::result::Result<Option<Identity>, AuthError>> + Send>>;

// ============================================================================
// AuthProvider - External identity service
// ============================================================================

/// Trait for the external auth provider
///
/// Implementations must publish every successful sign-in, sign-up, sign-out
/// and profile update on the streams returned by `subscribe`.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Sign in with email and password
    async fn sign_in(&self, email: &str, password: &str)
        -> std::result::Result<Identity, AuthError>;

    /// Create a new identity and sign it in
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        profile: &ProfileUpdate,
    ) -> std::result::Result<Identity, AuthError>;

    /// Invalidate the current identity
    async fn sign_out(&self) -> std::result::Result<(), AuthError>;

    /// Update display name and/or photo of the current identity
    async fn update_profile(
        &self,
        update: &ProfileUpdate,
    ) -> std::result::Result<Identity, AuthError>;

    /// Subscribe to identity changes
    fn subscribe(&self) -> IdentityChanges;

    /// Derive a fresh credential for the identity
    async fn credential(&self, identity: &Identity) -> std::result::Result<Credential, AuthError>;
}

// ============================================================================
// UserDirectory - Remote user records
// ============================================================================

/// Trait for the remote user records that carry roles
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Look up a user record by email (`None` when there is no record)
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>>;

    /// Create the record for a newly registered identity
    async fn create(&self, record: &UserRecord) -> Result<UserRecord>;

    /// Mirror a profile update into the record
    async fn update_profile(&self, email: &str, update: &ProfileUpdate) -> Result<()>;
}
