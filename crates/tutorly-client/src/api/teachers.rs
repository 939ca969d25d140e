// Teacher applications (/teacher-requests)

use serde::Serialize;

use tutorly_core::models::{RequestStatus, TeacherRequest};
use tutorly_core::{validation, Result, ValidationError};

use crate::client::{segment, ApiClient};

#[derive(Debug, Serialize)]
struct ReviewBody {
    status: RequestStatus,
}

#[derive(Clone)]
pub struct TeacherRequestsApi {
    client: ApiClient,
}

impl TeacherRequestsApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Apply to teach
    pub async fn apply(&self, request: &TeacherRequest) -> Result<TeacherRequest> {
        validation::email(&request.email)?;
        for (field, value) in [
            ("title", &request.title),
            ("category", &request.category),
            ("experience", &request.experience),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::new(field, format!("{} is required", field)).into());
            }
        }
        self.client.post("/teacher-requests", request).await
    }

    pub async fn list(&self) -> Result<Vec<TeacherRequest>> {
        self.client.get("/teacher-requests").await
    }

    /// Accept or reject an application (admin)
    ///
    /// Accepting promotes the applicant to teacher on the server.
    pub async fn review(&self, id: &str, status: RequestStatus) -> Result<()> {
        tracing::info!(request_id = %id, status = status.as_str(), "Reviewing teacher request");
        self.client
            .patch_unit(
                &format!("/teacher-requests/{}", segment(id)),
                &ReviewBody { status },
            )
            .await
    }
}
