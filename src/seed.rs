use sqlx::SqlitePool;

use crate::config::AdminConfig;
use crate::db;
use crate::error::validation::normalize_email;
use crate::security::hash_password;
use crate::types::{now_unix, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    Created(i64),
    AlreadyPresent(i64),
}

/// Ensures the configured administrator exists. Never creates a second row for the same email,
/// and never touches an existing row (a changed password in config does not overwrite it).
pub async fn create_admin(pool: &SqlitePool, admin: &AdminConfig) -> anyhow::Result<SeedOutcome> {
    let email = normalize_email(&admin.email).map_err(|e| anyhow::anyhow!("admin.email: {}", e))?;

    if let Some(existing) = db::find_user_by_email(pool, &email).await? {
        if !existing.is_admin() {
            tracing::warn!(user_id = existing.id, "Configured admin email belongs to a non-admin user");
        }
        return Ok(SeedOutcome::AlreadyPresent(existing.id));
    }

    let name = admin.name.trim();
    let password_hash = hash_password(&admin.password).await.map_err(|e| anyhow::anyhow!("{}", e))?;
    let now = now_unix();
    // A concurrent starter may win the race; the unique email keeps it to one row.
    let inserted: Option<i64> = sqlx::query_scalar(
        "INSERT INTO users (name, name_search, email, password_hash, role, is_active, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?6) ON CONFLICT(email) DO NOTHING RETURNING id",
    )
    .bind(name)
    .bind(db::search_key(name))
    .bind(&email)
    .bind(&password_hash)
    .bind(Role::Admin.as_str())
    .bind(now)
    .fetch_optional(pool)
    .await?;

    match inserted {
        Some(id) => Ok(SeedOutcome::Created(id)),
        None => {
            let existing = db::find_user_by_email(pool, &email)
                .await?
                .ok_or_else(|| anyhow::anyhow!("admin insert conflicted but no row found for {}", email))?;
            Ok(SeedOutcome::AlreadyPresent(existing.id))
        }
    }
}
