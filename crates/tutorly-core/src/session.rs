// Session provider
//
// Single store for process-wide authentication state. The auth provider's
// identity-change stream is the only writer of the identity; operations
// flip the loading flag and the stream clears it once the provider has
// published the outcome.

use futures::StreamExt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::{AuthError, Error, Result};
use crate::identity::{Credential, Identity, ProfileUpdate, UserRecord};
use crate::traits::{AuthProvider, UserDirectory};

/// How long an operation waits for the provider to publish its outcome
const DEFAULT_SETTLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Tri-state view of the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Loading,
    Authenticated(Identity),
    Anonymous,
}

/// Point-in-time copy of the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub identity: Option<Identity>,
    pub loading: bool,
}

impl SessionSnapshot {
    fn initial() -> Self {
        Self {
            identity: None,
            loading: true,
        }
    }

    pub fn state(&self) -> SessionState {
        match (&self.identity, self.loading) {
            (_, true) => SessionState::Loading,
            (Some(identity), false) => SessionState::Authenticated(identity.clone()),
            (None, false) => SessionState::Anonymous,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        !self.loading && self.identity.is_some()
    }
}

/// Process-wide authentication state
///
/// Create one per process, call [`SessionProvider::start`] once a tokio
/// runtime is available and hand out `Arc`s. Readers subscribe to
/// snapshots; only the provider subscription task writes the identity.
pub struct SessionProvider {
    auth: Arc<dyn AuthProvider>,
    directory: Arc<dyn UserDirectory>,
    state: Arc<watch::Sender<SessionSnapshot>>,
    subscription: Mutex<Option<JoinHandle<()>>>,
    settle_timeout: Duration,
}

impl SessionProvider {
    pub fn new(auth: Arc<dyn AuthProvider>, directory: Arc<dyn UserDirectory>) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::initial());
        Self {
            auth,
            directory,
            state: Arc::new(state),
            subscription: Mutex::new(None),
            settle_timeout: DEFAULT_SETTLE_TIMEOUT,
        }
    }

    /// Override how long operations wait for the provider to publish
    pub fn with_settle_timeout(mut self, timeout: Duration) -> Self {
        self.settle_timeout = timeout;
        self
    }

    /// Subscribe to the auth provider. Calling it again is a no-op.
    pub fn start(&self) {
        let mut subscription = self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if subscription.is_some() {
            return;
        }

        let mut changes = self.auth.subscribe();
        let state = Arc::clone(&self.state);

        let handle = tokio::spawn(async move {
            let mut resolved = false;

            while let Some(change) = changes.next().await {
                match change {
                    Ok(identity) => {
                        tracing::debug!(
                            email = identity.as_ref().map(|i| i.email.as_str()),
                            "Identity changed"
                        );
                        state.send_modify(|snapshot| {
                            snapshot.identity = identity;
                            snapshot.loading = false;
                        });
                    }
                    Err(e) if !resolved => {
                        tracing::warn!("Initial identity resolution failed: {}", e);
                        state.send_modify(|snapshot| {
                            snapshot.identity = None;
                            snapshot.loading = false;
                        });
                    }
                    Err(e) => {
                        tracing::warn!("Identity subscription error: {}", e);
                        state.send_if_modified(|snapshot| {
                            std::mem::replace(&mut snapshot.loading, false)
                        });
                    }
                }
                resolved = true;
            }

            // Provider went away; never leave readers waiting on it
            tracing::debug!("Identity subscription ended");
            state.send_if_modified(|snapshot| std::mem::replace(&mut snapshot.loading, false));
        });

        *subscription = Some(handle);
    }

    /// Unsubscribe from the auth provider
    pub fn shutdown(&self) {
        let handle = self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
            tracing::debug!("Session provider shut down");
        }
    }

    /// Current snapshot
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().state()
    }

    /// Current identity, if any (also while an operation is in flight)
    pub fn identity(&self) -> Option<Identity> {
        self.state.borrow().identity.clone()
    }

    /// Receive every snapshot change
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    /// Wait until the session is not loading
    pub async fn settled(&self) -> SessionSnapshot {
        let mut rx = self.state.subscribe();
        let snapshot = match rx.wait_for(|s| !s.loading).await {
            Ok(snapshot) => snapshot.clone(),
            Err(_) => self.snapshot(),
        };
        snapshot
    }

    /// Sign in with email and password
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity> {
        self.start();
        self.set_loading(true);

        match self.auth.sign_in(email, password).await {
            Ok(identity) => {
                tracing::info!(email = %identity.email, "Signed in");
                self.await_publication().await;
                Ok(identity)
            }
            Err(e) => {
                tracing::warn!(email = %email, "Sign-in failed: {}", e);
                self.set_loading(false);
                Err(e.into())
            }
        }
    }

    /// Register a new identity and create its user record
    ///
    /// When the record cannot be created the identity still exists and
    /// stays signed in; the error carries it so the caller can retry the
    /// sync.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        profile: &ProfileUpdate,
    ) -> Result<Identity> {
        self.start();
        self.set_loading(true);

        let identity = match self.auth.sign_up(email, password, profile).await {
            Ok(identity) => identity,
            Err(e) => {
                tracing::warn!(email = %email, "Sign-up failed: {}", e);
                self.set_loading(false);
                return Err(e.into());
            }
        };
        self.await_publication().await;
        tracing::info!(email = %identity.email, "Registered");

        let record = UserRecord::for_identity(&identity);
        if let Err(e) = self.directory.create(&record).await {
            tracing::warn!(email = %identity.email, "User record sync failed: {}", e);
            return Err(Error::record_sync(identity, e.to_string()));
        }

        Ok(identity)
    }

    /// Sign out. Resolves immediately when nobody is signed in.
    pub async fn sign_out(&self) -> Result<()> {
        self.start();
        if self.state.borrow().identity.is_none() {
            tracing::debug!("Sign-out requested without a signed-in user");
            return Ok(());
        }

        self.set_loading(true);
        match self.auth.sign_out().await {
            Ok(()) => {
                tracing::info!("Signed out");
                self.await_publication().await;
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Sign-out failed: {}", e);
                self.set_loading(false);
                Err(e.into())
            }
        }
    }

    /// Update display name and/or photo on the provider and the user record
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Identity> {
        let current = self.identity().ok_or(AuthError::NotSignedIn)?;
        if update.is_empty() {
            return Ok(current);
        }

        let identity = self.auth.update_profile(update).await?;
        tracing::info!(email = %identity.email, "Profile updated");

        if let Err(e) = self.directory.update_profile(&current.email, update).await {
            tracing::warn!(email = %current.email, "Profile sync failed: {}", e);
            return Err(Error::record_sync(identity, e.to_string()));
        }

        Ok(identity)
    }

    /// Fresh credential for the current identity, `None` when anonymous
    pub async fn credential(&self) -> Result<Option<Credential>> {
        let Some(identity) = self.identity() else {
            return Ok(None);
        };
        let credential = self.auth.credential(&identity).await?;
        Ok(Some(credential))
    }

    fn set_loading(&self, loading: bool) {
        self.state.send_if_modified(|snapshot| {
            if snapshot.loading == loading {
                return false;
            }
            snapshot.loading = loading;
            true
        });
    }

    async fn await_publication(&self) {
        if tokio::time::timeout(self.settle_timeout, self.settled())
            .await
            .is_err()
        {
            tracing::warn!(
                timeout_secs = self.settle_timeout.as_secs(),
                "Auth provider did not publish the identity change in time"
            );
            self.set_loading(false);
        }
    }
}

impl Drop for SessionProvider {
    fn drop(&mut self) {
        self.shutdown();
    }
}
