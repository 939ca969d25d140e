// User records (/users)
//
// Also the UserDirectory the session and role resolvers read roles from.

use async_trait::async_trait;
use serde::Serialize;

use tutorly_core::{ProfileUpdate, Result, Role, UserDirectory, UserRecord};

use crate::client::{query_value, segment, ApiClient};

#[derive(Debug, Serialize)]
struct ProfileBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    photo_url: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct RoleBody {
    role: Role,
}

#[derive(Clone)]
pub struct UsersApi {
    client: ApiClient,
}

impl UsersApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// All user records, optionally filtered by name or email (admin)
    pub async fn list(&self, search: Option<&str>) -> Result<Vec<UserRecord>> {
        let path = match search.map(str::trim).filter(|s| !s.is_empty()) {
            Some(search) => format!("/users?search={}", query_value(search)),
            None => "/users".to_string(),
        };
        self.client.get(&path).await
    }

    pub async fn get(&self, email: &str) -> Result<Option<UserRecord>> {
        self.client.get_opt(&format!("/users/{}", segment(email))).await
    }

    /// Change a user's role (admin)
    pub async fn set_role(&self, email: &str, role: Role) -> Result<()> {
        tracing::info!(email = %email, role = %role, "Changing user role");
        self.client
            .patch_unit(&format!("/users/{}/role", segment(email)), &RoleBody { role })
            .await
    }
}

#[async_trait]
impl UserDirectory for UsersApi {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        self.get(email).await
    }

    async fn create(&self, record: &UserRecord) -> Result<UserRecord> {
        self.client.post("/users", record).await
    }

    async fn update_profile(&self, email: &str, update: &ProfileUpdate) -> Result<()> {
        let body = ProfileBody {
            name: update.display_name.as_deref(),
            photo_url: update.photo_url.as_deref(),
        };
        self.client
            .patch_unit(&format!("/users/{}", segment(email)), &body)
            .await
    }
}
