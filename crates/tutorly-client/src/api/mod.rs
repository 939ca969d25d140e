// Marketplace endpoints, one module per resource

pub mod assignments;
pub mod classes;
pub mod feedback;
pub mod payments;
pub mod teachers;
pub mod users;

pub use assignments::AssignmentsApi;
pub use classes::ClassesApi;
pub use feedback::FeedbackApi;
pub use payments::{EnrollmentFlow, PaymentGateway, PaymentsApi};
pub use teachers::TeacherRequestsApi;
pub use users::UsersApi;
