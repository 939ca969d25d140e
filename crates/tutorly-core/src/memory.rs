// In-memory implementations for examples and testing
//
// These implementations keep all data in memory, making them useful for:
// - Unit and integration tests
// - Running the guards without an identity service or API
// - Quick prototyping

use async_trait::async_trait;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio_stream::wrappers::WatchStream;
use uuid::Uuid;

use crate::error::{AuthError, Error, Result};
use crate::identity::{Credential, Identity, ProfileUpdate, Role, UserRecord};
use crate::jwt::{AccessTokenClaims, JwtConfig, JwtService};
use crate::navigation::{Navigator, Redirect};
use crate::traits::{AuthProvider, IdentityChanges, UserDirectory};

/// Shortest password the in-memory provider accepts
const MIN_PASSWORD_LEN: usize = 6;

// ============================================================================
// InMemoryAuthProvider - Accounts and the current identity in memory
// ============================================================================

struct Account {
    password: String,
    identity: Identity,
}

/// In-memory auth provider
///
/// Credentials are real HS256 tokens so tests can check what a request
/// carried with [`InMemoryAuthProvider::validate`].
pub struct InMemoryAuthProvider {
    accounts: Mutex<HashMap<String, Account>>,
    current: watch::Sender<Option<Identity>>,
    initial_error: Mutex<Option<AuthError>>,
    jwt: JwtService,
    credential_calls: AtomicUsize,
    sign_out_calls: AtomicUsize,
}

impl Default for InMemoryAuthProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryAuthProvider {
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self {
            accounts: Mutex::new(HashMap::new()),
            current,
            initial_error: Mutex::new(None),
            jwt: JwtService::new(JwtConfig::default()),
            credential_calls: AtomicUsize::new(0),
            sign_out_calls: AtomicUsize::new(0),
        }
    }

    /// Register an account that can sign in
    pub fn add_account(&self, email: &str, password: &str, identity: Identity) {
        self.accounts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                email.to_lowercase(),
                Account {
                    password: password.to_string(),
                    identity,
                },
            );
    }

    /// Make the identity current as if a persisted session was restored
    pub fn restore(&self, identity: Identity) {
        self.current.send_replace(Some(identity));
    }

    /// Invalidate the current identity from the provider side
    pub fn revoke(&self) {
        self.current.send_replace(None);
    }

    /// Make the next subscription fail its initial resolution
    pub fn fail_initial_resolution(&self, error: AuthError) {
        *self
            .initial_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(error);
    }

    /// Decode a credential issued by this provider
    pub fn validate(&self, token: &str) -> Option<AccessTokenClaims> {
        self.jwt.validate_access_token(token).ok()
    }

    pub fn credential_calls(&self) -> usize {
        self.credential_calls.load(Ordering::SeqCst)
    }

    pub fn sign_out_calls(&self) -> usize {
        self.sign_out_calls.load(Ordering::SeqCst)
    }

    fn current_identity(&self) -> Option<Identity> {
        self.current.borrow().clone()
    }
}

#[async_trait]
impl AuthProvider for InMemoryAuthProvider {
    async fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> std::result::Result<Identity, AuthError> {
        let identity = {
            let accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
            match accounts.get(&email.to_lowercase()) {
                Some(account) if account.password == password => account.identity.clone(),
                _ => return Err(AuthError::InvalidCredentials),
            }
        };

        self.current.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        profile: &ProfileUpdate,
    ) -> std::result::Result<Identity, AuthError> {
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::rejected("Password should be at least 6 characters"));
        }

        let identity = {
            let mut accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
            let key = email.to_lowercase();
            if accounts.contains_key(&key) {
                return Err(AuthError::EmailInUse(email.to_string()));
            }

            let mut identity = Identity::new(Uuid::now_v7().to_string(), email);
            identity.apply(profile);
            accounts.insert(
                key,
                Account {
                    password: password.to_string(),
                    identity: identity.clone(),
                },
            );
            identity
        };

        self.current.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> std::result::Result<(), AuthError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        self.current.send_replace(None);
        Ok(())
    }

    async fn update_profile(
        &self,
        update: &ProfileUpdate,
    ) -> std::result::Result<Identity, AuthError> {
        let mut identity = self.current_identity().ok_or(AuthError::NotSignedIn)?;
        identity.apply(update);

        if let Some(account) = self
            .accounts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&identity.email.to_lowercase())
        {
            account.identity = identity.clone();
        }

        self.current.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    fn subscribe(&self) -> IdentityChanges {
        let rx = self.current.subscribe();
        let initial_error = self
            .initial_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(error) = initial_error {
            let failed = futures::stream::once(async move { Err(error) });
            return Box::pin(failed.chain(WatchStream::from_changes(rx).map(Ok)));
        }
        Box::pin(WatchStream::new(rx).map(Ok))
    }

    async fn credential(&self, identity: &Identity) -> std::result::Result<Credential, AuthError> {
        self.credential_calls.fetch_add(1, Ordering::SeqCst);

        match self.current_identity() {
            Some(current) if current.uid == identity.uid => {}
            _ => return Err(AuthError::SessionInvalid),
        }

        self.jwt
            .generate_access_token(identity)
            .map(Credential::new)
            .map_err(|e| AuthError::rejected(e.to_string()))
    }
}

// ============================================================================
// InMemoryUserDirectory - User records in memory
// ============================================================================

/// In-memory user directory
///
/// Stores records keyed by lowercase email. Lookups can be delayed per
/// email to reproduce out-of-order responses.
#[derive(Debug, Default, Clone)]
pub struct InMemoryUserDirectory {
    users: Arc<RwLock<HashMap<String, UserRecord>>>,
    delays: Arc<Mutex<HashMap<String, Duration>>>,
    fail_writes: Arc<AtomicBool>,
    unavailable: Arc<AtomicBool>,
    lookups: Arc<AtomicUsize>,
}

impl InMemoryUserDirectory {
    /// Create a new in-memory user directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate with a record (useful for testing)
    pub async fn insert(&self, record: UserRecord) {
        self.users
            .write()
            .await
            .insert(record.email.to_lowercase(), record);
    }

    /// Shorthand for inserting a record with a role
    pub async fn insert_role(&self, email: &str, role: Role) {
        self.insert(UserRecord {
            email: email.to_string(),
            name: None,
            photo_url: None,
            role,
        })
        .await;
    }

    pub async fn get(&self, email: &str) -> Option<UserRecord> {
        self.users.read().await.get(&email.to_lowercase()).cloned()
    }

    /// Change the role of an existing record
    pub async fn set_role(&self, email: &str, role: Role) {
        if let Some(record) = self.users.write().await.get_mut(&email.to_lowercase()) {
            record.role = role;
        }
    }

    /// Delay lookups for one email
    pub fn delay_lookup(&self, email: &str, delay: Duration) {
        self.delays
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(email.to_lowercase(), delay);
    }

    /// Make create/update fail
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make lookups fail with a network error
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of lookups issued so far
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);

        let delay = self
            .delays
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&email.to_lowercase())
            .copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::network("user directory unavailable"));
        }
        Ok(self.get(email).await)
    }

    async fn create(&self, record: &UserRecord) -> Result<UserRecord> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Api {
                status: 500,
                message: "write rejected".to_string(),
            });
        }
        self.insert(record.clone()).await;
        Ok(record.clone())
    }

    async fn update_profile(&self, email: &str, update: &ProfileUpdate) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Api {
                status: 500,
                message: "write rejected".to_string(),
            });
        }

        let mut users = self.users.write().await;
        let record = users.get_mut(&email.to_lowercase()).ok_or(Error::NotFound)?;
        if let Some(name) = &update.display_name {
            record.name = Some(name.clone());
        }
        if let Some(photo) = &update.photo_url {
            record.photo_url = Some(photo.clone());
        }
        Ok(())
    }
}

// ============================================================================
// RecordingNavigator - Collects redirects
// ============================================================================

/// Navigator that records every redirect
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    redirects: Mutex<Vec<Redirect>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn redirects(&self) -> Vec<Redirect> {
        self.redirects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last(&self) -> Option<Redirect> {
        self.redirects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    pub fn clear(&self) {
        self.redirects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, redirect: Redirect) {
        self.redirects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(redirect);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_provider_rejects_duplicate_and_weak_sign_up() {
        let auth = InMemoryAuthProvider::new();
        auth.sign_up("a@example.com", "Secret1", &ProfileUpdate::new())
            .await
            .unwrap();

        let err = auth
            .sign_up("A@example.com", "Secret1", &ProfileUpdate::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::EmailInUse(_)));

        let err = auth
            .sign_up("b@example.com", "abc", &ProfileUpdate::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_credential_for_stale_identity_is_rejected() {
        let auth = InMemoryAuthProvider::new();
        let identity = Identity::new("u-1", "a@example.com");
        auth.restore(identity.clone());

        let credential = auth.credential(&identity).await.unwrap();
        let claims = auth.validate(credential.token()).unwrap();
        assert_eq!(claims.sub, "u-1");

        auth.revoke();
        let err = auth.credential(&identity).await.unwrap_err();
        assert_eq!(err, AuthError::SessionInvalid);
        assert_eq!(auth.credential_calls(), 2);
    }

    #[tokio::test]
    async fn test_subscription_yields_current_then_changes() {
        let auth = InMemoryAuthProvider::new();
        let mut changes = auth.subscribe();

        assert_eq!(changes.next().await.unwrap().unwrap(), None);

        auth.restore(Identity::new("u-1", "a@example.com"));
        let next = changes.next().await.unwrap().unwrap();
        assert_eq!(next.map(|i| i.uid), Some("u-1".to_string()));
    }

    #[tokio::test]
    async fn test_directory_update_profile() {
        let directory = InMemoryUserDirectory::new();
        directory.insert_role("t@example.com", Role::Teacher).await;

        directory
            .update_profile("t@example.com", &ProfileUpdate::new().photo_url("https://img/t.png"))
            .await
            .unwrap();
        let record = directory.get("t@example.com").await.unwrap();
        assert_eq!(record.photo_url.as_deref(), Some("https://img/t.png"));
        assert_eq!(record.role, Role::Teacher);

        let err = directory
            .update_profile("missing@example.com", &ProfileUpdate::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound));
    }

    #[test]
    fn test_recording_navigator() {
        let navigator = RecordingNavigator::new();
        navigator.navigate(Redirect::forbidden("/a"));
        navigator.navigate(Redirect::login("/b"));
        assert_eq!(navigator.redirects().len(), 2);
        assert_eq!(navigator.last(), Some(Redirect::login("/b")));
        navigator.clear();
        assert!(navigator.redirects().is_empty());
    }
}
