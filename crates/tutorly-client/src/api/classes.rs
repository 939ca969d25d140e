// Classes (/classes, /teachers/:email/classes)

use serde::Serialize;

use tutorly_core::listing::DEFAULT_PER_PAGE;
use tutorly_core::models::{ClassDraft, ClassRecord, ClassStatus};
use tutorly_core::{paginate, validation, ClassQuery, Page, Result};

use crate::client::{segment, ApiClient};

#[derive(Debug, Serialize)]
struct StatusBody {
    status: ClassStatus,
}

#[derive(Clone)]
pub struct ClassesApi {
    client: ApiClient,
}

impl ClassesApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Classes, optionally only those with `status`
    pub async fn list(&self, status: Option<ClassStatus>) -> Result<Vec<ClassRecord>> {
        let path = match status {
            Some(status) => format!("/classes?status={}", status.as_str()),
            None => "/classes".to_string(),
        };
        self.client.get(&path).await
    }

    /// Fetch, filter and page classes
    ///
    /// The server only filters by status; search and teacher filters run
    /// locally.
    pub async fn search(
        &self,
        query: &ClassQuery,
        page: usize,
        per_page: Option<usize>,
    ) -> Result<Page<ClassRecord>> {
        let classes = self.list(query.status).await?;
        let matching = query.apply(classes);
        Ok(paginate(matching, page, per_page.unwrap_or(DEFAULT_PER_PAGE)))
    }

    pub async fn get(&self, id: &str) -> Result<Option<ClassRecord>> {
        self.client.get_opt(&format!("/classes/{}", segment(id))).await
    }

    pub async fn by_teacher(&self, email: &str) -> Result<Vec<ClassRecord>> {
        self.client
            .get(&format!("/teachers/{}/classes", segment(email)))
            .await
    }

    /// Submit a class for review; it starts out pending
    pub async fn create(&self, draft: &ClassDraft) -> Result<ClassRecord> {
        validation::class_draft(draft)?;
        self.client.post("/classes", draft).await
    }

    pub async fn update(&self, id: &str, draft: &ClassDraft) -> Result<ClassRecord> {
        validation::class_draft(draft)?;
        self.client
            .patch(&format!("/classes/{}", segment(id)), draft)
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.client.delete(&format!("/classes/{}", segment(id))).await
    }

    /// Approve or reject a class (admin)
    pub async fn set_status(&self, id: &str, status: ClassStatus) -> Result<()> {
        tracing::info!(class_id = %id, status = status.as_str(), "Reviewing class");
        self.client
            .patch_unit(
                &format!("/classes/{}/status", segment(id)),
                &StatusBody { status },
            )
            .await
    }
}
