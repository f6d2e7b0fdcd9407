use sqlx::SqlitePool;
use tracing::info;

use crate::config::AppConfig;
use crate::db;
use crate::seed::{self, SeedOutcome};

/// Startup hook: schema first, then the administrator. Any error aborts startup.
pub async fn on_startup(pool: &SqlitePool, cfg: &AppConfig) -> anyhow::Result<SeedOutcome> {
    db::create_all_tables(pool)
        .await
        .map_err(|e| e.context("creating database schema"))?;

    let outcome = seed::create_admin(pool, &cfg.admin)
        .await
        .map_err(|e| e.context("seeding administrator"))?;
    match outcome {
        SeedOutcome::Created(id) => info!(user_id = id, email = %cfg.admin.email, "Created administrator"),
        SeedOutcome::AlreadyPresent(id) => info!(user_id = id, "Administrator already present"),
    }
    Ok(outcome)
}
