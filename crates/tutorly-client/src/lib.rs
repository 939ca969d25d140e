// Tutorly client
//
// HTTP side of the Tutorly client: the authenticated request client, the
// token-service auth provider and the marketplace endpoints.
//
// Key design decisions:
// - Every request asks the SessionProvider for a fresh credential; nothing
//   here stores tokens except the auth provider itself
// - 403 and 401 responses redirect through the Navigator and still reject
//   the call
// - Resource APIs are thin wrappers that validate input before sending

pub mod api;
pub mod app;
pub mod auth;
pub mod client;
pub mod config;

pub use api::{
    AssignmentsApi, ClassesApi, EnrollmentFlow, FeedbackApi, PaymentGateway, PaymentsApi,
    TeacherRequestsApi, UsersApi,
};
pub use app::TutorlyApp;
pub use auth::HttpAuthProvider;
pub use client::ApiClient;
pub use config::ClientConfig;
