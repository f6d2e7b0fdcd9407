//! # Feed AI API
//!
//! REST backend for Feed AI, a SaaS to get feedback with AI for a brand. It exposes
//! authentication, user management and search endpoints under `/api`.
//!
//! ## Architecture
//!
//! - **Axum**: HTTP server and routing
//! - **SQLx**: asynchronous SQLite access
//! - **Tokio**: async runtime
//! - **Serde**: JSON request and response bodies
//!
//! ## Core Components
//!
//! - [`config`]: layered configuration (defaults, files, environment, `PORT`)
//! - [`db`]: connection pool, schema creation and row helpers
//! - [`seed`]: idempotent administrator creation
//! - [`startup`]: the startup hook that runs schema creation then seeding
//! - [`security`]: bearer tokens and password hashing
//! - [`middleware`]: authentication extractors and rate limiting
//! - [`routes`]: HTTP handlers and the application router
//! - [`error`]: error type and its JSON rendering
//! - [`extract`]: `Json`/`Query`/`Path` extractors that reject with [`error::AppError`]
//! - [`metrics`]: request counters
//! - [`state`]: shared application state
//! - [`types`]: rows and data transfer objects

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod security;
pub mod seed;
pub mod startup;
pub mod state;
pub mod types;

#[cfg(test)]
mod tests;
