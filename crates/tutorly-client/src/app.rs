// Application wiring
//
// Decision: The session owns a users directory whose client only holds a
// Weak<SessionProvider>, so the session and its request client do not keep
// each other alive

use std::sync::Arc;

use tutorly_core::{
    AuthProvider, GuardedRoute, Navigator, Result, RouteGuard, SessionProvider, SessionSnapshot,
};

use crate::api::{
    AssignmentsApi, ClassesApi, EnrollmentFlow, FeedbackApi, PaymentGateway, PaymentsApi,
    TeacherRequestsApi, UsersApi,
};
use crate::auth::HttpAuthProvider;
use crate::client::{http_client, ApiClient};
use crate::config::ClientConfig;

/// One session plus everything that talks to the API on its behalf
pub struct TutorlyApp {
    session: Arc<SessionProvider>,
    api: ApiClient,
    navigator: Arc<dyn Navigator>,
}

impl TutorlyApp {
    /// Wire the app against the token service in `config`
    pub fn new(config: &ClientConfig, navigator: Arc<dyn Navigator>) -> Result<Self> {
        let http = http_client(config)?;
        let auth = Arc::new(HttpAuthProvider::new(config, http.clone()));
        Ok(Self::with_provider(config, http, auth, navigator))
    }

    /// Wire the app with any auth provider
    pub fn with_provider(
        config: &ClientConfig,
        http: reqwest::Client,
        auth: Arc<dyn AuthProvider>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let session = Arc::new_cyclic(|weak| {
            let client = ApiClient::with_session(
                &config.api_url,
                http.clone(),
                weak.clone(),
                Arc::clone(&navigator),
            );
            SessionProvider::new(auth, Arc::new(UsersApi::new(client)))
        });
        let api = ApiClient::with_session(
            &config.api_url,
            http,
            Arc::downgrade(&session),
            Arc::clone(&navigator),
        );

        Self {
            session,
            api,
            navigator,
        }
    }

    /// Subscribe to the auth provider and wait for the initial identity
    pub async fn start(&self) -> SessionSnapshot {
        self.session.start();
        self.session.settled().await
    }

    pub fn session(&self) -> &Arc<SessionProvider> {
        &self.session
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Mount a guarded route against this app's session
    pub fn mount(&self, guard: RouteGuard) -> GuardedRoute {
        GuardedRoute::mount(
            guard,
            &self.session,
            Arc::new(self.users()),
            Arc::clone(&self.navigator),
        )
    }

    pub fn users(&self) -> UsersApi {
        UsersApi::new(self.api.clone())
    }

    pub fn classes(&self) -> ClassesApi {
        ClassesApi::new(self.api.clone())
    }

    pub fn teacher_requests(&self) -> TeacherRequestsApi {
        TeacherRequestsApi::new(self.api.clone())
    }

    pub fn assignments(&self) -> AssignmentsApi {
        AssignmentsApi::new(self.api.clone())
    }

    pub fn payments(&self) -> PaymentsApi {
        PaymentsApi::new(self.api.clone())
    }

    pub fn feedback(&self) -> FeedbackApi {
        FeedbackApi::new(self.api.clone())
    }

    pub fn enrollment(&self, gateway: Arc<dyn PaymentGateway>) -> EnrollmentFlow {
        EnrollmentFlow::new(self.payments(), gateway)
    }
}
