use std::net::SocketAddr;
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use feedai::{config, db, routes, startup, state::AppState, types::now_unix};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logging: stdout + daily rotating file under ./logs
    std::fs::create_dir_all("logs").ok();
    let (stdout_nb, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
    let file_appender = tracing_appender::rolling::daily("logs", "feedai.log");
    let (file_nb, file_guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(stdout_nb))
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(file_nb))
        .init();
    // Keep the guards alive so the non-blocking writers flush on exit
    let _log_guards = (stdout_guard, file_guard);

    let app_cfg = config::load()?;

    let pool = db::connect(&app_cfg.database).await?;
    info!("Connected to database at {}", app_cfg.database.url);

    // Schema then admin; any failure ends the process before the listener is bound.
    startup::on_startup(&pool, &app_cfg).await?;

    let state = AppState::new(pool.clone(), app_cfg.clone());

    // Periodic housekeeping: expired sessions and idle rate-limiter entries
    {
        let limiter = state.login_limiter.clone();
        let metrics = state.metrics.clone();
        let pool = pool.clone();
        let every = Duration::from_secs(app_cfg.auth.session_cleanup_interval_seconds);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                limiter.cleanup_old_entries().await;
                match db::purge_expired_sessions(&pool, now_unix()).await {
                    Ok(0) => {}
                    Ok(n) => {
                        metrics.add_sessions_revoked(n);
                        info!("Purged {} expired sessions", n);
                    }
                    Err(e) => warn!("Failed to purge expired sessions: {}", e),
                }
            }
        });
    }

    let app = routes::app(state);

    let host = app_cfg.server.host.clone();
    let port = app_cfg.server.port;
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid listen addr {}:{} - {}", host, port, e))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Feed AI API listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    info!("Shutdown signal received. Stopping server...");
}
