// Integration tests for the authenticated request client
//
// The API is a wiremock server; identities come from the in-memory auth
// provider so every request carries a real signed token.

use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_json, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tutorly_client::{ApiClient, ClientConfig, TutorlyApp};
use tutorly_core::memory::{InMemoryAuthProvider, RecordingNavigator};
use tutorly_core::models::ClassStatus;
use tutorly_core::{
    ClassQuery, Destination, Error, GuardDecision, HistoryMode, Identity, Redirect, Role,
    RouteGuard, UserDirectory,
};

struct Harness {
    server: MockServer,
    auth: Arc<InMemoryAuthProvider>,
    navigator: Arc<RecordingNavigator>,
    app: TutorlyApp,
}

impl Harness {
    async fn new() -> Self {
        let server = MockServer::start().await;
        let auth = Arc::new(InMemoryAuthProvider::new());
        auth.add_account(
            "student@example.com",
            "Secret1",
            Identity::new("u-student", "student@example.com").with_display_name("Stu"),
        );
        auth.add_account(
            "admin@example.com",
            "Secret1",
            Identity::new("u-admin", "admin@example.com"),
        );

        let navigator = Arc::new(RecordingNavigator::new());
        let config = ClientConfig::default().with_api_url(&server.uri());
        let app = TutorlyApp::with_provider(
            &config,
            reqwest::Client::new(),
            auth.clone(),
            navigator.clone(),
        );
        app.start().await;

        Self {
            server,
            auth,
            navigator,
            app,
        }
    }

    async fn signed_in(email: &str) -> Self {
        let harness = Self::new().await;
        harness.app.session().sign_in(email, "Secret1").await.unwrap();
        harness
    }

    async fn authorization_headers(&self) -> Vec<Option<String>> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .map(|r| {
                r.headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string)
            })
            .collect()
    }
}

fn class_json(id: &str, title: &str, status: &str) -> serde_json::Value {
    json!({
        "id": id,
        "title": title,
        "teacher_name": "Ferris",
        "teacher_email": "ferris@example.com",
        "price": 25.0,
        "status": status
    })
}

#[tokio::test]
async fn test_anonymous_requests_carry_no_authorization() {
    let harness = Harness::new().await;
    Mock::given(method("GET"))
        .and(path("/classes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&harness.server)
        .await;

    let classes = harness.app.classes().list(None).await.unwrap();
    assert!(classes.is_empty());
    assert_eq!(harness.authorization_headers().await, vec![None]);
    assert_eq!(harness.auth.credential_calls(), 0);
}

#[tokio::test]
async fn test_signed_in_requests_carry_fresh_bearer_token() {
    let harness = Harness::signed_in("student@example.com").await;
    Mock::given(method("GET"))
        .and(path("/classes"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(2)
        .mount(&harness.server)
        .await;

    harness.app.classes().list(None).await.unwrap();
    harness.app.classes().list(None).await.unwrap();

    let headers = harness.authorization_headers().await;
    assert_eq!(headers.len(), 2);
    for header in headers {
        let header = header.unwrap();
        let token = header.strip_prefix("Bearer ").unwrap();
        assert!(!token.is_empty());
        let claims = harness.auth.validate(token).unwrap();
        assert_eq!(claims.email, "student@example.com");
    }
    // One credential per request, never cached by the client
    assert_eq!(harness.auth.credential_calls(), 2);
}

#[tokio::test]
async fn test_forbidden_redirects_and_rejects() {
    let harness = Harness::signed_in("student@example.com").await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&harness.server)
        .await;

    let err = harness.app.users().list(None).await.unwrap_err();
    assert!(matches!(err, Error::Forbidden { ref path } if path == "/users"));
    assert!(err.redirected());

    let redirect = harness.navigator.last().unwrap();
    assert_eq!(redirect, Redirect::forbidden("/users"));
    assert_eq!(redirect.mode, HistoryMode::Replace);
    // Still signed in
    assert!(harness.app.session().snapshot().is_authenticated());
    assert_eq!(harness.auth.sign_out_calls(), 0);
}

#[tokio::test]
async fn test_unauthorized_signs_out_then_redirects_to_login() {
    let harness = Harness::signed_in("student@example.com").await;
    Mock::given(method("GET"))
        .and(path("/students/student@example.com/enrollments"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&harness.server)
        .await;

    let err = harness
        .app
        .payments()
        .enrollments("student@example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SessionExpired { .. }));

    assert_eq!(harness.auth.sign_out_calls(), 1);
    assert_eq!(harness.app.session().identity(), None);

    let redirect = harness.navigator.last().unwrap();
    assert_eq!(redirect.to, Destination::Login);
    assert_eq!(redirect.from, "/students/student@example.com/enrollments");
}

#[tokio::test]
async fn test_other_errors_do_not_redirect() {
    let harness = Harness::signed_in("student@example.com").await;
    Mock::given(method("GET"))
        .and(path("/feedback"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&harness.server)
        .await;

    let err = harness.app.feedback().list().await.unwrap_err();
    match err {
        Error::Api { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "boom");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(harness.navigator.redirects().is_empty());
}

#[tokio::test]
async fn test_missing_user_record_is_none() {
    let harness = Harness::signed_in("student@example.com").await;
    Mock::given(method("GET"))
        .and(path("/users/nobody@example.com"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&harness.server)
        .await;

    let users = harness.app.users();
    assert!(users.find_by_email("nobody@example.com").await.unwrap().is_none());
}

#[tokio::test]
async fn test_public_client_never_authenticates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/classes"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let config = ClientConfig::default().with_api_url(&server.uri());
    let client = ApiClient::public(&config).unwrap();
    let err = client
        .get::<Vec<serde_json::Value>>("/classes")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden { .. }));

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_guarded_route_reads_role_from_api() {
    let harness = Harness::signed_in("admin@example.com").await;
    Mock::given(method("GET"))
        .and(path("/users/admin@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "email": "admin@example.com",
            "role": "admin"
        })))
        .mount(&harness.server)
        .await;

    let mut admin_route = harness.app.mount(RouteGuard::admin("/dashboard/users"));
    assert_eq!(admin_route.resolve().await, GuardDecision::Render);

    let mut student_route = harness.app.mount(RouteGuard::student("/dashboard/my-enroll"));
    assert_eq!(
        student_route.resolve().await,
        GuardDecision::Redirect(Redirect::forbidden("/dashboard/my-enroll"))
    );
    assert_eq!(harness.navigator.redirects().len(), 1);
}

#[tokio::test]
async fn test_sign_up_creates_user_record() {
    let harness = Harness::new().await;
    Mock::given(method("POST"))
        .and(path("/users"))
        .and(header_exists("authorization"))
        .and(body_json(json!({
            "email": "new@example.com",
            "name": "Newbie",
            "photo_url": null,
            "role": "student"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "email": "new@example.com",
            "name": "Newbie",
            "role": "student"
        })))
        .expect(1)
        .mount(&harness.server)
        .await;

    let identity = harness
        .app
        .session()
        .sign_up(
            "new@example.com",
            "Secret1",
            &tutorly_core::ProfileUpdate::new().display_name("Newbie"),
        )
        .await
        .unwrap();
    assert_eq!(identity.email, "new@example.com");
}

#[tokio::test]
async fn test_set_role_sends_role() {
    let harness = Harness::signed_in("admin@example.com").await;
    Mock::given(method("PATCH"))
        .and(path("/users/student@example.com/role"))
        .and(body_json(json!({ "role": "admin" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&harness.server)
        .await;

    harness
        .app
        .users()
        .set_role("student@example.com", Role::Admin)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_class_search_filters_and_pages() {
    let harness = Harness::new().await;
    Mock::given(method("GET"))
        .and(path("/classes"))
        .and(query_param("status", "approved"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            class_json("c1", "Rust Basics", "approved"),
            class_json("c2", "Advanced Rust", "approved"),
            class_json("c3", "Cooking", "approved"),
        ])))
        .mount(&harness.server)
        .await;

    let query = ClassQuery::new().status(ClassStatus::Approved).search("rust");
    let page = harness
        .app
        .classes()
        .search(&query, 2, Some(1))
        .await
        .unwrap();

    assert_eq!(page.total, 2);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.items[0].id, "c2");
    assert!(!page.has_next());
}

#[tokio::test]
async fn test_invalid_feedback_is_rejected_before_sending() {
    let harness = Harness::signed_in("student@example.com").await;

    let feedback = tutorly_core::models::Feedback {
        id: String::new(),
        class_id: "c1".into(),
        student_email: "student@example.com".into(),
        student_name: None,
        rating: 9,
        description: "great".into(),
    };
    let err = harness.app.feedback().submit(&feedback).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert!(harness.server.received_requests().await.unwrap().is_empty());
}

struct ApprovingGateway;

#[async_trait::async_trait]
impl tutorly_client::PaymentGateway for ApprovingGateway {
    async fn confirm(&self, client_secret: &str, amount: f64) -> tutorly_core::Result<String> {
        assert_eq!(client_secret, "pi_secret");
        assert_eq!(amount, 25.0);
        Ok("txn_123".to_string())
    }
}

#[tokio::test]
async fn test_enrollment_pays_then_records() {
    let harness = Harness::signed_in("student@example.com").await;
    Mock::given(method("POST"))
        .and(path("/create-payment-intent"))
        .and(body_json(json!({ "price": 25.0 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "clientSecret": "pi_secret" })))
        .expect(1)
        .mount(&harness.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/payments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "p1",
            "class_id": "c1",
            "student_email": "student@example.com",
            "price": 25.0,
            "transaction_id": "txn_123",
            "paid_at": "2026-01-01T00:00:00Z"
        })))
        .expect(1)
        .mount(&harness.server)
        .await;

    let class: tutorly_core::models::ClassRecord =
        serde_json::from_value(class_json("c1", "Rust Basics", "approved")).unwrap();
    let student = harness.app.session().identity().unwrap();

    let payment = harness
        .app
        .enrollment(Arc::new(ApprovingGateway))
        .enroll(&class, &student)
        .await
        .unwrap();
    assert_eq!(payment.id, "p1");
    assert_eq!(payment.transaction_id, "txn_123");
}

#[tokio::test]
async fn test_put_is_authorized_and_intercepted() {
    let harness = Harness::signed_in("admin@example.com").await;
    Mock::given(method("PUT"))
        .and(path("/classes/c1"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&harness.server)
        .await;

    let err = harness
        .app
        .api()
        .put::<serde_json::Value, _>("/classes/c1", &json!({ "title": "Rust" }))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Forbidden { ref path } if path == "/classes/c1"));
    assert_eq!(
        harness.navigator.last(),
        Some(Redirect::forbidden("/classes/c1"))
    );
    assert!(harness.app.session().identity().is_some());
}
