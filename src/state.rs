use std::sync::Arc;

use crate::config::AppConfig;
use crate::metrics::Metrics;
use crate::middleware::RateLimiter;

/// The shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    /// The database connection pool; the per-request "session" handlers borrow from.
    pub db: sqlx::SqlitePool,
    pub config: Arc<AppConfig>,
    pub metrics: Metrics,
    /// Per-IP limiter for `POST /api/auth/login`.
    pub login_limiter: RateLimiter,
}

impl AppState {
    pub fn new(db: sqlx::SqlitePool, config: AppConfig) -> Self {
        let login_limiter =
            RateLimiter::new(config.auth.login_max_attempts, config.auth.login_window_seconds);
        Self { db, config: Arc::new(config), metrics: Metrics::new(), login_limiter }
    }
}
