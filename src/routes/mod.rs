//! HTTP route handlers for the Feed AI API.
//!
//! - `auth`: registration, login, logout and the current user
//! - `users`: user administration
//! - `search`: user directory search
//! - `health`: liveness, readiness, version and metrics
//!
//! The three API groups are mounted under [`API_PREFIX`] next to the protected root route.

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{middleware::AuthUser, state::AppState};

pub mod auth;
pub mod health;
pub mod search;
pub mod users;

pub const API_PREFIX: &str = "/api";

/// `GET /api`: greeting for authenticated callers.
pub async fn root(_auth: AuthUser) -> Json<Value> {
    Json(json!({ "Message": "Hello World!" }))
}

/// Builds the complete application: API groups, operational endpoints, tracing and CORS.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .route("/", get(root))
        .merge(auth::router())
        .merge(users::router())
        .merge(search::router());

    Router::new()
        .nest(API_PREFIX, api)
        .merge(health::router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        // Any origin, method and header with credentials: the request's values are mirrored
        // back, since a literal `*` is rejected by browsers when credentials are allowed.
        .layer(CorsLayer::very_permissive())
}
