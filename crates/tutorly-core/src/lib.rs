// Tutorly core
//
// Client-side session and access control for the Tutorly marketplace.
//
// Key design decisions:
// - SessionProvider is the single store for authentication state; the auth
//   provider's identity stream is its only identity writer
// - Roles come from the remote user record, looked up per mounted guard and
//   tagged with a generation so stale responses are dropped
// - Guards are an explicit PENDING/ALLOWED/DENIED state machine, testable
//   without any rendering framework
// - Transport lives behind traits (AuthProvider, UserDirectory, Navigator);
//   HTTP implementations are in tutorly-client

pub mod error;
pub mod guard;
pub mod identity;
pub mod jwt;
pub mod listing;
pub mod models;
pub mod navigation;
pub mod role;
pub mod session;
pub mod traits;
pub mod validation;

// In-memory implementations for examples and testing
pub mod memory;

// Re-exports for convenience
pub use error::{AuthError, Error, Result, ValidationError};
pub use guard::{GuardDecision, GuardState, GuardedRoute, RouteGuard};
pub use identity::{Credential, Identity, ProfileUpdate, Role, UserRecord};
pub use listing::{paginate, ClassQuery, Page};
pub use navigation::{Destination, HistoryMode, Navigator, Redirect, FORBIDDEN_PATH, LOGIN_PATH};
pub use role::{RoleResolver, RoleSnapshot, RoleView};
pub use session::{SessionProvider, SessionSnapshot, SessionState};
pub use traits::{AuthProvider, IdentityChanges, UserDirectory};
