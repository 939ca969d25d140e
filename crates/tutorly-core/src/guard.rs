// Role-gated routes
//
// A guarded route is in exactly one state at a time:
//
//   PENDING  - session loading, or the role of the current identity is
//              still being looked up. Show a placeholder.
//   ALLOWED  - identity present and its role equals the required role.
//              Render the route.
//   DENIED   - no identity, or a resolved role (or no role) that differs.
//              Redirect to /forbidden, replacing the attempted location.
//
// `RouteGuard` is the pure decision; `GuardedRoute` mounts it against a
// live session and keeps re-evaluating on every identity or role change.

use std::sync::Arc;
use tokio::sync::watch;

use crate::identity::Role;
use crate::navigation::{Navigator, Redirect};
use crate::role::{RoleResolver, RoleSnapshot};
use crate::session::{SessionProvider, SessionSnapshot};
use crate::traits::UserDirectory;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Pending,
    Allowed,
    Denied,
}

/// What a guarded route shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Blocking placeholder, nothing else
    Placeholder,
    /// The guarded children
    Render,
    /// Leave the route
    Redirect(Redirect),
}

/// Access rule for one guarded location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteGuard {
    required: Role,
    location: String,
}

impl RouteGuard {
    pub fn new(required: Role, location: impl Into<String>) -> Self {
        Self {
            required,
            location: location.into(),
        }
    }

    pub fn admin(location: impl Into<String>) -> Self {
        Self::new(Role::Admin, location)
    }

    pub fn teacher(location: impl Into<String>) -> Self {
        Self::new(Role::Teacher, location)
    }

    pub fn student(location: impl Into<String>) -> Self {
        Self::new(Role::Student, location)
    }

    pub fn required(&self) -> Role {
        self.required
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn evaluate(&self, session: &SessionSnapshot, role: &RoleSnapshot) -> GuardState {
        if session.loading {
            return GuardState::Pending;
        }
        let Some(identity) = session.identity.as_ref() else {
            return GuardState::Denied;
        };

        let view = role.for_identity(Some(identity));
        if view.loading {
            return GuardState::Pending;
        }
        match view.role {
            Some(role) if role == self.required => GuardState::Allowed,
            _ => GuardState::Denied,
        }
    }

    pub fn decide(&self, session: &SessionSnapshot, role: &RoleSnapshot) -> GuardDecision {
        match self.evaluate(session, role) {
            GuardState::Pending => GuardDecision::Placeholder,
            GuardState::Allowed => GuardDecision::Render,
            GuardState::Denied => GuardDecision::Redirect(Redirect::forbidden(&self.location)),
        }
    }
}

/// A guard mounted against a live session
///
/// Owns its own role resolver, so the role is looked up once per mount.
/// Dropping it unmounts the route and ignores late lookups.
pub struct GuardedRoute {
    guard: RouteGuard,
    session: watch::Receiver<SessionSnapshot>,
    roles: watch::Receiver<RoleSnapshot>,
    resolver: RoleResolver,
    navigator: Arc<dyn Navigator>,
    state: GuardState,
}

impl GuardedRoute {
    pub fn mount(
        guard: RouteGuard,
        session: &SessionProvider,
        directory: Arc<dyn UserDirectory>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let resolver = RoleResolver::spawn(session, directory);
        let roles = resolver.subscribe();

        let mut route = Self {
            guard,
            session: session.subscribe(),
            roles,
            resolver,
            navigator,
            state: GuardState::Pending,
        };
        route.reevaluate();
        route
    }

    pub fn guard(&self) -> &RouteGuard {
        &self.guard
    }

    pub fn state(&self) -> GuardState {
        self.state
    }

    /// Decision for the latest known session and role
    pub fn current(&self) -> GuardDecision {
        self.guard
            .decide(&self.session.borrow().clone(), &self.roles.borrow().clone())
    }

    /// Wait for the next session or role change and re-evaluate
    ///
    /// Returns `None` once the session or the resolver is gone.
    pub async fn changed(&mut self) -> Option<GuardDecision> {
        let alive = tokio::select! {
            r = self.session.changed() => r.is_ok(),
            r = self.roles.changed() => r.is_ok(),
        };
        if !alive {
            return None;
        }
        Some(self.reevaluate())
    }

    /// Wait until the guard leaves PENDING
    pub async fn resolve(&mut self) -> GuardDecision {
        loop {
            let decision = self.reevaluate();
            if decision != GuardDecision::Placeholder {
                return decision;
            }
            if self.changed().await.is_none() {
                return self.reevaluate();
            }
        }
    }

    /// Look the role up again; the route re-evaluates when it arrives
    pub fn refresh_role(&self) {
        self.resolver.refresh();
    }

    fn reevaluate(&mut self) -> GuardDecision {
        let session = self.session.borrow_and_update().clone();
        let roles = self.roles.borrow_and_update().clone();
        let next = self.guard.evaluate(&session, &roles);

        if next != self.state {
            tracing::debug!(
                location = %self.guard.location,
                from = ?self.state,
                to = ?next,
                "Guard state changed"
            );
        }

        let entered_denied = next == GuardState::Denied && self.state != GuardState::Denied;
        self.state = next;

        let decision = self.guard.decide(&session, &roles);
        if entered_denied {
            if let GuardDecision::Redirect(redirect) = &decision {
                tracing::info!(
                    location = %self.guard.location,
                    required = %self.guard.required,
                    "Access denied"
                );
                self.navigator.navigate(redirect.clone());
            }
        }
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;
    use crate::navigation::{Destination, HistoryMode};

    fn signed_in(email: &str) -> SessionSnapshot {
        SessionSnapshot {
            identity: Some(Identity::new("u-1", email)),
            loading: false,
        }
    }

    fn resolved(email: &str, role: Option<Role>) -> RoleSnapshot {
        RoleSnapshot {
            subject: Some(email.to_string()),
            role,
            loading: false,
        }
    }

    #[test]
    fn test_pending_while_session_loading() {
        let guard = RouteGuard::admin("/dashboard/users");
        let session = SessionSnapshot {
            identity: Some(Identity::new("u-1", "a@example.com")),
            loading: true,
        };
        let role = resolved("a@example.com", Some(Role::Admin));
        assert_eq!(guard.evaluate(&session, &role), GuardState::Pending);
        assert_eq!(guard.decide(&session, &role), GuardDecision::Placeholder);
    }

    #[test]
    fn test_pending_while_role_loading() {
        let guard = RouteGuard::teacher("/dashboard/add-class");
        let role = RoleSnapshot {
            subject: Some("t@example.com".into()),
            role: None,
            loading: true,
        };
        assert_eq!(
            guard.evaluate(&signed_in("t@example.com"), &role),
            GuardState::Pending
        );
    }

    #[test]
    fn test_pending_when_role_belongs_to_previous_identity() {
        let guard = RouteGuard::admin("/dashboard/users");
        let role = resolved("old@example.com", Some(Role::Admin));
        assert_eq!(
            guard.evaluate(&signed_in("new@example.com"), &role),
            GuardState::Pending
        );
    }

    #[test]
    fn test_anonymous_is_denied_with_origin() {
        let guard = RouteGuard::admin("/dashboard/users");
        let session = SessionSnapshot {
            identity: None,
            loading: false,
        };
        match guard.decide(&session, &RoleSnapshot::default()) {
            GuardDecision::Redirect(redirect) => {
                assert_eq!(redirect.to, Destination::Forbidden);
                assert_eq!(redirect.from, "/dashboard/users");
                assert_eq!(redirect.mode, HistoryMode::Replace);
            }
            other => panic!("unexpected decision: {other:?}"),
        }
    }

    #[test]
    fn test_wrong_role_is_denied() {
        let guard = RouteGuard::student("/dashboard/my-enroll");
        let role = resolved("t@example.com", Some(Role::Teacher));
        assert_eq!(
            guard.evaluate(&signed_in("t@example.com"), &role),
            GuardState::Denied
        );
    }

    #[test]
    fn test_missing_role_is_denied() {
        let guard = RouteGuard::student("/dashboard/my-enroll");
        let role = resolved("s@example.com", None);
        assert_eq!(
            guard.evaluate(&signed_in("s@example.com"), &role),
            GuardState::Denied
        );
    }

    #[test]
    fn test_matching_role_is_allowed() {
        for (guard, role) in [
            (RouteGuard::admin("/a"), Role::Admin),
            (RouteGuard::teacher("/t"), Role::Teacher),
            (RouteGuard::student("/s"), Role::Student),
        ] {
            let snapshot = resolved("x@example.com", Some(role));
            assert_eq!(
                guard.decide(&signed_in("x@example.com"), &snapshot),
                GuardDecision::Render
            );
        }
    }

    #[test]
    fn test_children_never_render_while_pending() {
        let guard = RouteGuard::admin("/dashboard/users");
        let identities = [None, Some(Identity::new("u-1", "a@example.com"))];
        let roles = [
            RoleSnapshot::default(),
            resolved("a@example.com", Some(Role::Admin)),
            RoleSnapshot {
                subject: Some("a@example.com".into()),
                role: None,
                loading: true,
            },
            resolved("b@example.com", Some(Role::Admin)),
        ];

        for identity in &identities {
            for loading in [true, false] {
                let session = SessionSnapshot {
                    identity: identity.clone(),
                    loading,
                };
                for role in &roles {
                    let view = role.for_identity(session.identity.as_ref());
                    let decision = guard.decide(&session, role);
                    if loading || view.loading {
                        assert_eq!(decision, GuardDecision::Placeholder);
                    }
                }
            }
        }
    }
}
