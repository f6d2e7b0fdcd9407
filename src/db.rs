use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;

use crate::config::DatabaseConfig;
use crate::types::{now_unix, Role, UserRow};

/// Opens the connection pool, creating the database file (and its directory) on first use.
pub async fn connect(cfg: &DatabaseConfig) -> anyhow::Result<SqlitePool> {
    crate::config::ensure_sqlite_parent_dir(&cfg.url)?;
    let options = SqliteConnectOptions::from_str(&cfg.url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(10));
    let pool = SqlitePoolOptions::new()
        .max_connections(cfg.max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Creates every table and index the API needs. Safe to run against an initialized database.
pub async fn create_all_tables(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            name_search TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'user' CHECK (role IN ('admin', 'user')),
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )"#,
    )
    .execute(pool)
    .await?;

    // Only token digests are stored; the bearer token itself never touches disk.
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS sessions (
            token_hash TEXT PRIMARY KEY,
            user_id INTEGER NOT NULL,
            created_at INTEGER NOT NULL,
            expires_at INTEGER NOT NULL,
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
        )"#,
    )
    .execute(pool)
    .await?;

    let indexes = [
        ("idx_users_role", "CREATE INDEX IF NOT EXISTS idx_users_role ON users(role)"),
        ("idx_users_name_search", "CREATE INDEX IF NOT EXISTS idx_users_name_search ON users(name_search, id)"),
        ("idx_sessions_user", "CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id)"),
        ("idx_sessions_expires", "CREATE INDEX IF NOT EXISTS idx_sessions_expires ON sessions(expires_at)"),
    ];
    for (name, query) in indexes {
        if let Err(e) = sqlx::query(query).execute(pool).await {
            tracing::warn!("Failed to create index {}: {}", name, e);
        }
    }

    tracing::debug!("Database schema ensured");
    Ok(())
}

/// Lower-cased form of a display name, stored in `users.name_search` and used for search patterns.
pub fn search_key(name: &str) -> String {
    name.to_lowercase()
}

pub async fn find_user_by_id(pool: &SqlitePool, id: i64) -> sqlx::Result<Option<UserRow>> {
    sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = ?1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_user_by_email(pool: &SqlitePool, email: &str) -> sqlx::Result<Option<UserRow>> {
    sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = ?1")
        .bind(email)
        .fetch_optional(pool)
        .await
}

/// Inserts a user and returns the stored row. A duplicate email surfaces as a unique violation.
pub async fn insert_user(
    pool: &SqlitePool,
    name: &str,
    email: &str,
    password_hash: &str,
    role: Role,
) -> sqlx::Result<UserRow> {
    let now = now_unix();
    sqlx::query_as::<_, UserRow>(
        "INSERT INTO users (name, name_search, email, password_hash, role, is_active, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?6) RETURNING *",
    )
    .bind(name)
    .bind(search_key(name))
    .bind(email)
    .bind(password_hash)
    .bind(role.as_str())
    .bind(now)
    .fetch_one(pool)
    .await
}

#[cfg(test)]
pub async fn count_admins(pool: &SqlitePool) -> sqlx::Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'admin'").fetch_one(pool).await
}

pub async fn insert_session(
    pool: &SqlitePool,
    token_hash: &str,
    user_id: i64,
    expires_at: i64,
) -> sqlx::Result<()> {
    sqlx::query("INSERT INTO sessions (token_hash, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)")
        .bind(token_hash)
        .bind(user_id)
        .bind(now_unix())
        .bind(expires_at)
        .execute(pool)
        .await?;
    Ok(())
}

/// Resolves a token digest to its active, unexpired owner.
pub async fn find_session_user(pool: &SqlitePool, token_hash: &str, now: i64) -> sqlx::Result<Option<UserRow>> {
    sqlx::query_as::<_, UserRow>(
        "SELECT u.* FROM sessions s JOIN users u ON u.id = s.user_id \
         WHERE s.token_hash = ?1 AND s.expires_at > ?2 AND u.is_active = 1",
    )
    .bind(token_hash)
    .bind(now)
    .fetch_optional(pool)
    .await
}

pub async fn delete_session(pool: &SqlitePool, token_hash: &str) -> sqlx::Result<u64> {
    let res = sqlx::query("DELETE FROM sessions WHERE token_hash = ?1").bind(token_hash).execute(pool).await?;
    Ok(res.rows_affected())
}

pub async fn delete_user_sessions(pool: &SqlitePool, user_id: i64) -> sqlx::Result<u64> {
    let res = sqlx::query("DELETE FROM sessions WHERE user_id = ?1").bind(user_id).execute(pool).await?;
    Ok(res.rows_affected())
}

pub async fn purge_expired_sessions(pool: &SqlitePool, now: i64) -> sqlx::Result<u64> {
    let res = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?1").bind(now).execute(pool).await?;
    Ok(res.rows_affected())
}
