use async_trait::async_trait;
use axum::http::{HeaderName, HeaderValue};
use axum_test::TestServer;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use realvid_auth::services::email::{EmailError, EmailKind, EmailMessage, EmailSender};
use realvid_auth::services::jwt::JwtService;
use realvid_auth::{create_app, AppState, Components};

pub const TEST_JWT_SECRET: &str = "test-secret-key-for-testing-only";

/// Captures every email instead of sending it.
#[derive(Default)]
pub struct Outbox {
    messages: Mutex<Vec<EmailMessage>>,
}

#[allow(dead_code)]
impl Outbox {
    pub async fn count(&self, kind: EmailKind) -> usize {
        self.messages
            .lock()
            .await
            .iter()
            .filter(|m| m.kind == kind)
            .count()
    }

    pub async fn last(&self, kind: EmailKind) -> Option<EmailMessage> {
        self.messages
            .lock()
            .await
            .iter()
            .rev()
            .find(|m| m.kind == kind)
            .cloned()
    }

    /// Token from the `?token=` link of the newest email of `kind`.
    pub async fn last_token(&self, kind: EmailKind) -> Option<String> {
        self.last(kind)
            .await
            .and_then(|m| m.action_url)
            .and_then(|url| url.split("token=").nth(1).map(str::to_string))
    }
}

#[async_trait]
impl EmailSender for Outbox {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        self.messages.lock().await.push(message.clone());
        Ok(())
    }
}

// Allow dead_code for utilities used by other test files
#[allow(dead_code)]
pub struct TestContext {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub outbox: Arc<Outbox>,
    next_ip: AtomicU32,
}

#[allow(dead_code)]
impl TestContext {
    pub async fn new() -> Self {
        Self::with_state(|state| state)
    }

    /// Builds the app on in-memory stores; `customize` can swap parts of
    /// the state (e.g. tighter rate limits) before the server starts.
    pub fn with_state(customize: impl FnOnce(AppState) -> AppState) -> Self {
        let outbox = Arc::new(Outbox::default());
        let mut components = Components::in_memory();
        components.email_sender = outbox.clone();

        let jwt_service = JwtService::new(TEST_JWT_SECRET).expect("jwt secret");
        let state = AppState::new(components, jwt_service, "http://localhost:3000")
            .expect("app state");
        let state = Arc::new(customize(state));

        let server = TestServer::new(create_app(state.clone())).expect("Failed to create test server");

        Self {
            server,
            state,
            outbox,
            next_ip: AtomicU32::new(1),
        }
    }

    /// A fresh client address, so helper traffic never shares a rate-limit
    /// bucket with the request under test.
    pub fn fresh_ip(&self) -> HeaderValue {
        let n = self.next_ip.fetch_add(1, Ordering::Relaxed);
        HeaderValue::from_str(&format!("10.{}.{}.{}", (n >> 16) & 255, (n >> 8) & 255, n & 255))
            .expect("ip header")
    }

    pub async fn register(&self, email: &str) -> Value {
        let response = self
            .server
            .post("/api/auth/register")
            .add_header(forwarded_for(), self.fresh_ip())
            .json(&json!({
                "firstName": "Jane",
                "lastName": "Doe",
                "email": email,
                "phone": "5551234567",
                "password": test_password()
            }))
            .await;
        response.json()
    }

    pub async fn verify(&self) {
        let token = self
            .outbox
            .last_token(EmailKind::Verification)
            .await
            .expect("verification email");
        self.server
            .get("/api/auth/verify-email")
            .add_header(forwarded_for(), self.fresh_ip())
            .add_query_param("token", &token)
            .await
            .assert_status_ok();
    }

    pub async fn login(&self, email: &str, password: &str) -> axum_test::TestResponse {
        self.server
            .post("/api/auth/login")
            .add_header(forwarded_for(), self.fresh_ip())
            .json(&json!({ "email": email, "password": password }))
            .await
    }

    /// Registers, verifies and logs in. Returns the access token.
    pub async fn verified_user(&self, email: &str) -> String {
        self.register(email).await;
        self.verify().await;
        let body: Value = self.login(email, test_password()).await.json();
        body["data"]["accessToken"]
            .as_str()
            .expect("access token")
            .to_string()
    }

    pub async fn csrf_token(&self) -> String {
        let body: Value = self
            .server
            .get("/api/auth/csrf-token")
            .add_header(forwarded_for(), self.fresh_ip())
            .await
            .json();
        body["data"]["csrfToken"]
            .as_str()
            .expect("csrf token")
            .to_string()
    }
}

#[allow(dead_code)]
pub fn forwarded_for() -> HeaderName {
    HeaderName::from_static("x-forwarded-for")
}

#[allow(dead_code)]
pub fn csrf_header() -> HeaderName {
    HeaderName::from_static("x-csrf-token")
}

// Helper to generate unique test email
#[allow(dead_code)]
pub fn test_email() -> String {
    format!("agent_{}@example.com", uuid::Uuid::new_v4().simple())
}

// Helper to generate test password
#[allow(dead_code)]
pub fn test_password() -> &'static str {
    "TestPassword123!"
}
