// Role resolution
//
// Follows the session and looks up the role of the current identity in the
// user directory. Every lookup carries a generation number; only the
// lookup for the latest identity may publish its result.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::identity::{Identity, Role};
use crate::session::{SessionProvider, SessionSnapshot};
use crate::traits::UserDirectory;

/// Role lookup state, tagged with the email it belongs to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleSnapshot {
    /// Email the lookup was issued for
    pub subject: Option<String>,
    pub role: Option<Role>,
    pub loading: bool,
}

/// Role as seen by a consumer that knows the current identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleView {
    pub role: Option<Role>,
    pub loading: bool,
}

impl RoleSnapshot {
    /// View of this snapshot for the given identity
    ///
    /// A snapshot computed for someone else counts as loading, so a present
    /// identity never looks like "resolved without a role" before its own
    /// lookup has finished.
    pub fn for_identity(&self, identity: Option<&Identity>) -> RoleView {
        match identity {
            None => RoleView {
                role: None,
                loading: false,
            },
            Some(identity) if self.subject.as_deref() == Some(identity.email.as_str()) => {
                RoleView {
                    role: self.role,
                    loading: self.loading,
                }
            }
            Some(_) => RoleView {
                role: None,
                loading: true,
            },
        }
    }
}

struct ResolverInner {
    directory: Arc<dyn UserDirectory>,
    state: watch::Sender<RoleSnapshot>,
    generation: AtomicU64,
    subject: Mutex<Option<String>>,
    lookups: Mutex<Vec<JoinHandle<()>>>,
}

impl ResolverInner {
    /// React to the session's identity; lookups start only on a new subject
    fn observe(self: &Arc<Self>, identity: Option<&Identity>) {
        let email = identity.map(|i| i.email.clone());
        {
            let mut subject = self.subject.lock().unwrap_or_else(PoisonError::into_inner);
            if *subject == email {
                return;
            }
            *subject = email.clone();
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        match email {
            None => {
                self.state.send_replace(RoleSnapshot::default());
            }
            Some(email) => {
                self.state.send_replace(RoleSnapshot {
                    subject: Some(email.clone()),
                    role: None,
                    loading: true,
                });
                self.spawn_lookup(generation, email);
            }
        }
    }

    /// Re-issue the lookup for the current subject without dropping the
    /// role that is already published
    fn refresh(self: &Arc<Self>) {
        let email = self
            .subject
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(email) = email {
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            self.spawn_lookup(generation, email);
        }
    }

    fn spawn_lookup(self: &Arc<Self>, generation: u64, email: String) {
        let inner = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let role = match inner.directory.find_by_email(&email).await {
                Ok(Some(record)) => Some(record.role),
                Ok(None) => {
                    tracing::warn!(email = %email, "No user record for identity");
                    None
                }
                Err(e) => {
                    tracing::warn!(email = %email, "Role lookup failed: {}", e);
                    None
                }
            };

            let published = inner.state.send_if_modified(|snapshot| {
                if inner.generation.load(Ordering::SeqCst) != generation {
                    return false;
                }
                *snapshot = RoleSnapshot {
                    subject: Some(email.clone()),
                    role,
                    loading: false,
                };
                true
            });

            if published {
                tracing::debug!(email = %email, role = ?role, "Role resolved");
            } else {
                tracing::debug!(email = %email, generation, "Discarding stale role lookup");
            }
        });

        let mut lookups = self.lookups.lock().unwrap_or_else(PoisonError::into_inner);
        lookups.retain(|h| !h.is_finished());
        lookups.push(handle);
    }

    fn abort_lookups(&self) {
        for handle in self
            .lookups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
        {
            handle.abort();
        }
    }
}

/// Resolves the role of the session's identity
///
/// One resolver per mounted guard; dropping it stops following the session
/// and ignores lookups still in flight.
pub struct RoleResolver {
    inner: Arc<ResolverInner>,
    watcher: JoinHandle<()>,
}

impl RoleResolver {
    /// Start following the session
    pub fn spawn(session: &SessionProvider, directory: Arc<dyn UserDirectory>) -> Self {
        Self::follow(session.subscribe(), directory)
    }

    /// Start following a stream of session snapshots
    pub fn follow(
        mut session: watch::Receiver<SessionSnapshot>,
        directory: Arc<dyn UserDirectory>,
    ) -> Self {
        let (state, _) = watch::channel(RoleSnapshot::default());
        let inner = Arc::new(ResolverInner {
            directory,
            state,
            generation: AtomicU64::new(0),
            subject: Mutex::new(None),
            lookups: Mutex::new(Vec::new()),
        });

        let identity = session.borrow_and_update().identity.clone();
        inner.observe(identity.as_ref());

        let watcher_inner = Arc::clone(&inner);
        let watcher = tokio::spawn(async move {
            while session.changed().await.is_ok() {
                let identity = session.borrow_and_update().identity.clone();
                watcher_inner.observe(identity.as_ref());
            }
        });

        Self { inner, watcher }
    }

    pub fn snapshot(&self) -> RoleSnapshot {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RoleSnapshot> {
        self.inner.state.subscribe()
    }

    /// Look the role up again, e.g. after it may have changed remotely
    pub fn refresh(&self) {
        self.inner.refresh();
    }

    /// Wait until no lookup is pending for the published subject
    pub async fn resolved(&self) -> RoleSnapshot {
        let mut rx = self.inner.state.subscribe();
        let snapshot = match rx.wait_for(|s| !s.loading).await {
            Ok(snapshot) => snapshot.clone(),
            Err(_) => self.snapshot(),
        };
        snapshot
    }
}

impl Drop for RoleResolver {
    fn drop(&mut self) {
        self.watcher.abort();
        self.inner.abort_lookups();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryAuthProvider, InMemoryUserDirectory};
    use std::time::Duration;

    async fn setup() -> (Arc<InMemoryAuthProvider>, Arc<InMemoryUserDirectory>, SessionProvider) {
        let auth = Arc::new(InMemoryAuthProvider::new());
        auth.add_account("admin@example.com", "Secret1", Identity::new("u-admin", "admin@example.com"));
        auth.add_account("teacher@example.com", "Secret1", Identity::new("u-teacher", "teacher@example.com"));

        let directory = Arc::new(InMemoryUserDirectory::new());
        directory.insert_role("admin@example.com", Role::Admin).await;
        directory.insert_role("teacher@example.com", Role::Teacher).await;

        let session = SessionProvider::new(auth.clone(), directory.clone());
        session.start();
        session.settled().await;
        (auth, directory, session)
    }

    #[tokio::test]
    async fn test_no_identity_means_no_lookup() {
        let (_auth, directory, session) = setup().await;
        let resolver = RoleResolver::spawn(&session, directory.clone());

        let snapshot = resolver.resolved().await;
        assert_eq!(snapshot.role, None);
        assert!(!snapshot.loading);
        assert_eq!(directory.lookups(), 0);
    }

    #[tokio::test]
    async fn test_resolves_role_for_identity() {
        let (_auth, directory, session) = setup().await;
        session.sign_in("admin@example.com", "Secret1").await.unwrap();

        let resolver = RoleResolver::spawn(&session, directory.clone());
        let initial = resolver.snapshot();
        assert!(initial.loading);
        assert_eq!(initial.subject.as_deref(), Some("admin@example.com"));

        let snapshot = resolver.resolved().await;
        assert_eq!(snapshot.role, Some(Role::Admin));
        assert_eq!(directory.lookups(), 1);
    }

    #[tokio::test]
    async fn test_lookup_failure_resolves_without_role() {
        let (_auth, directory, session) = setup().await;
        directory.set_unavailable(true);
        session.sign_in("admin@example.com", "Secret1").await.unwrap();

        let resolver = RoleResolver::spawn(&session, directory.clone());
        let snapshot = resolver.resolved().await;
        assert_eq!(snapshot.role, None);
        assert!(!snapshot.loading);
    }

    #[tokio::test]
    async fn test_view_for_other_subject_is_loading() {
        let snapshot = RoleSnapshot {
            subject: Some("old@example.com".into()),
            role: Some(Role::Admin),
            loading: false,
        };
        let identity = Identity::new("u-new", "new@example.com");
        let view = snapshot.for_identity(Some(&identity));
        assert!(view.loading);
        assert_eq!(view.role, None);

        let view = snapshot.for_identity(None);
        assert!(!view.loading);
        assert_eq!(view.role, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_lookup_is_discarded() {
        let (_auth, directory, session) = setup().await;
        directory.delay_lookup("admin@example.com", Duration::from_secs(5));
        let resolver = RoleResolver::spawn(&session, directory.clone());

        session.sign_in("admin@example.com", "Secret1").await.unwrap();
        let mut roles = resolver.subscribe();
        roles
            .wait_for(|s| s.subject.as_deref() == Some("admin@example.com"))
            .await
            .unwrap();
        session.sign_out().await.unwrap();
        session.sign_in("teacher@example.com", "Secret1").await.unwrap();

        let snapshot = roles
            .wait_for(|s| s.subject.as_deref() == Some("teacher@example.com") && !s.loading)
            .await
            .unwrap()
            .clone();
        assert_eq!(snapshot.role, Some(Role::Teacher));

        // Let the slow admin lookup finish; it must not overwrite the teacher role
        tokio::time::sleep(Duration::from_secs(10)).await;
        let snapshot = resolver.snapshot();
        assert_eq!(snapshot.subject.as_deref(), Some("teacher@example.com"));
        assert_eq!(snapshot.role, Some(Role::Teacher));
        assert_eq!(directory.lookups(), 2);
    }

    #[tokio::test]
    async fn test_refresh_picks_up_role_change() {
        let (_auth, directory, session) = setup().await;
        session.sign_in("teacher@example.com", "Secret1").await.unwrap();
        let resolver = RoleResolver::spawn(&session, directory.clone());
        assert_eq!(resolver.resolved().await.role, Some(Role::Teacher));

        let mut changes = resolver.subscribe();
        changes.borrow_and_update();
        directory.set_role("teacher@example.com", Role::Student).await;
        resolver.refresh();

        changes.changed().await.unwrap();
        assert_eq!(changes.borrow().role, Some(Role::Student));
    }

    #[tokio::test]
    async fn test_profile_update_does_not_refetch() {
        let (_auth, directory, session) = setup().await;
        directory.insert_role("teacher@example.com", Role::Teacher).await;
        session.sign_in("teacher@example.com", "Secret1").await.unwrap();
        let resolver = RoleResolver::spawn(&session, directory.clone());
        resolver.resolved().await;

        session
            .update_profile(&crate::identity::ProfileUpdate::new().display_name("T"))
            .await
            .unwrap();
        tokio::task::yield_now().await;
        assert_eq!(directory.lookups(), 1);
    }
}
