#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use crate::seed::{create_admin, SeedOutcome};
    use crate::tests::{test_config, ADMIN_EMAIL, ADMIN_PASSWORD};
    use crate::{db, security, startup};

    async fn fresh_pool(dir: &TempDir) -> (sqlx::SqlitePool, crate::config::AppConfig) {
        let cfg = test_config(dir);
        let pool = db::connect(&cfg.database).await.unwrap();
        (pool, cfg)
    }

    #[tokio::test]
    async fn test_create_all_tables() {
        let dir = TempDir::new().unwrap();
        let (pool, _) = fresh_pool(&dir).await;
        db::create_all_tables(&pool).await.unwrap();

        let tables: Vec<String> =
            sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
                .fetch_all(&pool)
                .await
                .unwrap();
        assert!(tables.contains(&"users".to_string()));
        assert!(tables.contains(&"sessions".to_string()));
    }

    #[tokio::test]
    async fn test_create_all_tables_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let (pool, _) = fresh_pool(&dir).await;
        db::create_all_tables(&pool).await.unwrap();
        db::insert_user(&pool, "Keep", "keep@example.com", "x", crate::types::Role::User).await.unwrap();

        db::create_all_tables(&pool).await.unwrap();
        assert!(db::find_user_by_email(&pool, "keep@example.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_startup_seeds_admin_once() {
        let dir = TempDir::new().unwrap();
        let (pool, cfg) = fresh_pool(&dir).await;

        let first = startup::on_startup(&pool, &cfg).await.unwrap();
        let second = startup::on_startup(&pool, &cfg).await.unwrap();

        let id = match first {
            SeedOutcome::Created(id) => id,
            other => panic!("expected Created, got {:?}", other),
        };
        assert_eq!(second, SeedOutcome::AlreadyPresent(id));
        assert_eq!(db::count_admins(&pool).await.unwrap(), 1);

        let admin = db::find_user_by_email(&pool, ADMIN_EMAIL).await.unwrap().unwrap();
        assert!(admin.is_admin());
        assert!(admin.is_active);
        assert!(security::verify_password_blocking(ADMIN_PASSWORD, &admin.password_hash));
    }

    #[tokio::test]
    async fn test_seed_survives_a_new_pool_on_same_database() {
        let dir = TempDir::new().unwrap();
        let (pool, cfg) = fresh_pool(&dir).await;
        startup::on_startup(&pool, &cfg).await.unwrap();
        pool.close().await;

        // Simulates a process restart
        let (pool, cfg) = fresh_pool(&dir).await;
        let outcome = startup::on_startup(&pool, &cfg).await.unwrap();
        assert!(matches!(outcome, SeedOutcome::AlreadyPresent(_)));
        assert_eq!(db::count_admins(&pool).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_seed_does_not_overwrite_existing_password() {
        let dir = TempDir::new().unwrap();
        let (pool, mut cfg) = fresh_pool(&dir).await;
        startup::on_startup(&pool, &cfg).await.unwrap();

        cfg.admin.password = "a-rotated-password".to_string();
        create_admin(&pool, &cfg.admin).await.unwrap();

        let admin = db::find_user_by_email(&pool, ADMIN_EMAIL).await.unwrap().unwrap();
        assert!(security::verify_password_blocking(ADMIN_PASSWORD, &admin.password_hash));
    }

    #[tokio::test]
    async fn test_seed_fails_without_schema() {
        let dir = TempDir::new().unwrap();
        let (pool, cfg) = fresh_pool(&dir).await;
        assert!(create_admin(&pool, &cfg.admin).await.is_err());
    }

    #[tokio::test]
    async fn test_purge_expired_sessions() {
        let dir = TempDir::new().unwrap();
        let (pool, cfg) = fresh_pool(&dir).await;
        startup::on_startup(&pool, &cfg).await.unwrap();
        let admin = db::find_user_by_email(&pool, ADMIN_EMAIL).await.unwrap().unwrap();
        let now = crate::types::now_unix();

        db::insert_session(&pool, "old", admin.id, now - 10).await.unwrap();
        db::insert_session(&pool, "fresh", admin.id, now + 3600).await.unwrap();

        assert_eq!(db::purge_expired_sessions(&pool, now).await.unwrap(), 1);
        assert!(db::find_session_user(&pool, "fresh", now).await.unwrap().is_some());
        assert!(db::find_session_user(&pool, "old", now).await.unwrap().is_none());
    }
}
