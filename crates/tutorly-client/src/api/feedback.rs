// Class feedback (/feedback)

use tutorly_core::models::Feedback;
use tutorly_core::{validation, Result};

use crate::client::ApiClient;

#[derive(Clone)]
pub struct FeedbackApi {
    client: ApiClient,
}

impl FeedbackApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn submit(&self, feedback: &Feedback) -> Result<()> {
        validation::feedback(feedback)?;
        self.client.post_unit("/feedback", feedback).await
    }

    pub async fn list(&self) -> Result<Vec<Feedback>> {
        self.client.get("/feedback").await
    }
}
