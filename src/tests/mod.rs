//! Integration and unit tests for the Feed AI API.
//!
//! - **api_tests**: protected root endpoint, CORS, operational endpoints
//! - **auth_tests**: registration, login, logout, rate limiting
//! - **users_tests**: user administration and access rules
//! - **search_tests**: user directory search
//! - **startup_tests**: schema creation and administrator seeding
//! - **config_tests**: configuration layering and validation
//! - **error_tests**: error to HTTP response mapping
//!
//! Every test gets its own SQLite file in a temporary directory.

pub mod api_tests;
pub mod startup_tests;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use crate::{config::AppConfig, db, routes, startup, state::AppState};

pub const ADMIN_EMAIL: &str = "root@feedai.test";
pub const ADMIN_PASSWORD: &str = "admin-password-1";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    // Dropping the directory removes the database file
    _dir: TempDir,
}

pub fn test_config(dir: &TempDir) -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.database.url = format!("sqlite://{}", dir.path().join("test.db").display());
    cfg.database.max_connections = 4;
    cfg.admin.email = ADMIN_EMAIL.to_string();
    cfg.admin.password = ADMIN_PASSWORD.to_string();
    cfg.auth.login_max_attempts = 50;
    cfg
}

pub async fn setup_with(configure: impl FnOnce(&mut AppConfig)) -> TestApp {
    let dir = TempDir::new().unwrap();
    let mut cfg = test_config(&dir);
    configure(&mut cfg);
    let pool = db::connect(&cfg.database).await.unwrap();
    startup::on_startup(&pool, &cfg).await.unwrap();
    let state = AppState::new(pool, cfg);
    TestApp { router: routes::app(state.clone()), state, _dir: dir }
}

pub async fn setup() -> TestApp {
    setup_with(|_| {}).await
}

impl TestApp {
    pub async fn send(&self, req: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Value) {
        let response = self.router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, headers, body)
    }

    pub async fn request(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let req = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let (status, _, body) = self.send(req).await;
        (status, body)
    }

    pub async fn login(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(serde_json::json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body["access_token"].as_str().unwrap().to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    /// Registers a regular user and returns `(id, token)`.
    pub async fn user(&self, name: &str, email: &str) -> (i64, String) {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/auth/register",
                None,
                Some(serde_json::json!({ "name": name, "email": email, "password": "user-password-1" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
        let id = body["id"].as_i64().unwrap();
        (id, self.login(email, "user-password-1").await)
    }
}
