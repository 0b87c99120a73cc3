#![allow(dead_code)]

use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum_test::{TestResponse, TestServer};
use inkpost_api::services::{accounts, notifications};
use inkpost_api::{build_router, ApiConfig, AppState};
use inkpost_auth::{HashAlgorithm, MemorySessionStore};
use inkpost_email::{EmailTemplates, MemoryProvider, SiteInfo};
use inkpost_orm::{MemoryStore, Store};
use inkpost_queue::{Dispatcher, MemoryOutbox, OutboxStore, QueueConfig};
use serde_json::{json, Value};
use std::sync::Arc;

pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub outbox: Arc<MemoryOutbox>,
    pub mailer: MemoryProvider,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(ApiConfig::default())
    }

    pub fn with_config(config: ApiConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let outbox = Arc::new(MemoryOutbox::new());
        let state = AppState::new(
            store.clone() as Arc<dyn Store>,
            outbox.clone() as Arc<dyn OutboxStore>,
            Arc::new(MemorySessionStore::new(3600)),
            HashAlgorithm::Bcrypt.development_hasher(),
            config,
        );
        let server = TestServer::new(build_router(state.clone())).expect("test server");
        Self {
            server,
            state,
            store,
            outbox,
            mailer: MemoryProvider::new(),
        }
    }

    async fn account(&self, email: &str, username: &str, is_admin: bool) -> String {
        let registration = accounts::Registration {
            email: email.into(),
            username: username.into(),
            password: "password123".into(),
            full_name: None,
        };
        accounts::register(
            self.store.as_ref(),
            self.state.hasher.clone(),
            registration,
            is_admin,
        )
        .await
        .expect("account created");
        self.login(email, "password123").await
    }

    /// Signs in a fresh administrator and returns its bearer token
    pub async fn admin_token(&self) -> String {
        self.account("admin@example.com", "admin", true).await
    }

    pub async fn reader_token(&self) -> String {
        self.account("reader@example.com", "reader", false).await
    }

    pub async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .server
            .post("/auth/login")
            .json(&json!({ "email": email, "password": password }))
            .await;
        response.assert_status_ok();
        response.json::<Value>()["token"]
            .as_str()
            .expect("token in login response")
            .to_string()
    }

    /// Creates a post as admin and returns the response body
    pub async fn create_post(&self, token: &str, body: Value) -> Value {
        let response = self
            .server
            .post("/posts")
            .add_header(header::AUTHORIZATION, bearer(token))
            .json(&body)
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json()
    }

    pub async fn published_post(&self, token: &str, title: &str) -> Value {
        self.create_post(
            token,
            json!({ "title": title, "content": "Body text", "status": "published" }),
        )
        .await
    }

    pub async fn create_comment(&self, post_id: i64, parent_id: Option<i64>, content: &str) -> Value {
        let response = self
            .server
            .post("/comments")
            .json(&json!({
                "post_id": post_id,
                "parent_id": parent_id,
                "author_name": "Reader",
                "author_email": "reader@example.com",
                "content": content,
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json()
    }

    /// Runs one dispatcher pass delivering into `self.mailer`
    pub async fn dispatch(&self) {
        let site = SiteInfo {
            name: self.state.config.site.name.clone(),
            url: self.state.config.site.url.clone(),
        };
        let templates = EmailTemplates::new(site, "Inkpost <noreply@example.com>").expect("templates");
        let registry = notifications::handlers(
            self.store.clone(),
            Arc::new(self.mailer.clone()),
            Arc::new(templates),
        );
        Dispatcher::new(self.outbox.clone(), registry, QueueConfig::default())
            .run_once()
            .await
            .expect("dispatch");
    }
}

pub fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {}", token)).expect("valid header")
}

pub fn forwarded_for(ip: &'static str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("x-forwarded-for"),
        HeaderValue::from_static(ip),
    )
}

pub fn error_code(response: &TestResponse) -> String {
    response.json::<Value>()["error"]["code"]
        .as_str()
        .unwrap_or_default()
        .to_string()
}
