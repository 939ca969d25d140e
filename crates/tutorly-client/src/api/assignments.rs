// Assignments and submissions

use serde::Serialize;

use tutorly_core::models::{Assignment, AssignmentDraft, NewSubmission, Submission};
use tutorly_core::{validation, Result, ValidationError};

use crate::client::{segment, ApiClient};

#[derive(Debug, Serialize)]
struct GradeBody {
    grade: f32,
}

#[derive(Clone)]
pub struct AssignmentsApi {
    client: ApiClient,
}

impl AssignmentsApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, class_id: &str) -> Result<Vec<Assignment>> {
        self.client
            .get(&format!("/classes/{}/assignments", segment(class_id)))
            .await
    }

    pub async fn create(&self, class_id: &str, draft: &AssignmentDraft) -> Result<Assignment> {
        if draft.title.trim().is_empty() {
            return Err(ValidationError::new("title", "Title is required").into());
        }
        self.client
            .post(&format!("/classes/{}/assignments", segment(class_id)), draft)
            .await
    }

    pub async fn submit(&self, assignment_id: &str, submission: &NewSubmission) -> Result<Submission> {
        validation::submission_url(&submission.url)?;
        self.client
            .post(
                &format!("/assignments/{}/submissions", segment(assignment_id)),
                submission,
            )
            .await
    }

    pub async fn submissions(&self, assignment_id: &str) -> Result<Vec<Submission>> {
        self.client
            .get(&format!("/assignments/{}/submissions", segment(assignment_id)))
            .await
    }

    pub async fn grade(&self, submission_id: &str, grade: f32) -> Result<()> {
        if !grade.is_finite() || grade < 0.0 {
            return Err(ValidationError::new("grade", "Grade must be zero or more").into());
        }
        self.client
            .patch_unit(
                &format!("/submissions/{}/grade", segment(submission_id)),
                &GradeBody { grade },
            )
            .await
    }
}
