use std::path::Path;

use serde::Deserialize;

const DEFAULTS: &str = include_str!("../config/default.toml");

/// Password shipped in `config/default.toml`; startup warns when it is still in use.
pub const DEFAULT_ADMIN_PASSWORD: &str = "change-me-now";

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Take the client IP from `X-Forwarded-For`/`X-Real-IP` instead of the TCP peer.
    #[serde(default)]
    pub trust_proxy_headers: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Lifetime of a bearer token issued by `/api/auth/login`.
    pub token_ttl_minutes: i64,
    pub login_max_attempts: usize,
    pub login_window_seconds: u64,
    pub session_cleanup_interval_seconds: u64,
}

/// Credentials of the administrator created on first startup.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub admin: AdminConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        // The embedded defaults are part of the binary; failing to parse them is a build defect.
        match ::config::Config::builder()
            .add_source(::config::File::from_str(DEFAULTS, ::config::FileFormat::Toml))
            .build()
            .and_then(|cfg| cfg.try_deserialize())
        {
            Ok(app_cfg) => app_cfg,
            Err(e) => panic!("Failed to parse embedded default config: {}", e),
        }
    }
}

/// Loads configuration: embedded defaults -> feedai.toml -> $FEEDAI_CONFIG -> FEEDAI__* env -> PORT.
pub fn load() -> anyhow::Result<AppConfig> {
    // Load .env first (optional)
    let _ = dotenvy::dotenv();

    let mut builder = ::config::Config::builder()
        .add_source(::config::File::from_str(DEFAULTS, ::config::FileFormat::Toml))
        .add_source(::config::File::with_name("feedai").required(false));

    if let Ok(custom_path) = std::env::var("FEEDAI_CONFIG") {
        builder = builder.add_source(::config::File::with_name(&custom_path).required(false));
    }
    builder = builder.add_source(::config::Environment::with_prefix("FEEDAI").separator("__"));

    let mut app_cfg: AppConfig = builder.build()?.try_deserialize()?;
    if let Some(port) = parse_port(std::env::var("PORT").ok().as_deref())? {
        app_cfg.server.port = port;
    }
    validate(&app_cfg)?;
    Ok(app_cfg)
}

/// Builds a configuration from the embedded defaults overlaid with `overlay` (TOML).
/// Ignores the process environment.
#[cfg(test)]
pub fn from_toml_str(overlay: &str) -> anyhow::Result<AppConfig> {
    let app_cfg: AppConfig = ::config::Config::builder()
        .add_source(::config::File::from_str(DEFAULTS, ::config::FileFormat::Toml))
        .add_source(::config::File::from_str(overlay, ::config::FileFormat::Toml))
        .build()?
        .try_deserialize()?;
    validate(&app_cfg)?;
    Ok(app_cfg)
}

/// Interprets the `PORT` environment variable. Absent or blank means "keep configured port".
pub fn parse_port(raw: Option<&str>) -> anyhow::Result<Option<u16>> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    match raw.parse::<u16>() {
        Ok(0) | Err(_) => Err(anyhow::anyhow!("invalid PORT: {:?}", raw)),
        Ok(port) => Ok(Some(port)),
    }
}

pub fn validate(cfg: &AppConfig) -> anyhow::Result<()> {
    // Server
    if cfg.server.port == 0 {
        return Err(anyhow::anyhow!("invalid server.port: {}", cfg.server.port));
    }
    #[cfg(unix)]
    if cfg.server.port < 1024 {
        tracing::warn!("Using privileged port {} - may require elevated permissions", cfg.server.port);
    }

    // Database
    if cfg.database.url.trim().is_empty() {
        return Err(anyhow::anyhow!("database.url must not be empty"));
    }
    if cfg.database.max_connections == 0 {
        return Err(anyhow::anyhow!("database.max_connections must be > 0"));
    }

    // Auth
    if cfg.auth.token_ttl_minutes <= 0 {
        return Err(anyhow::anyhow!("auth.token_ttl_minutes must be > 0"));
    }
    if cfg.auth.login_max_attempts == 0 {
        return Err(anyhow::anyhow!("auth.login_max_attempts must be > 0"));
    }
    if cfg.auth.login_window_seconds == 0 {
        return Err(anyhow::anyhow!("auth.login_window_seconds must be > 0"));
    }
    if cfg.auth.session_cleanup_interval_seconds == 0 {
        return Err(anyhow::anyhow!("auth.session_cleanup_interval_seconds must be > 0"));
    }

    // Admin seed
    if !cfg.admin.email.contains('@') {
        return Err(anyhow::anyhow!("admin.email is not a valid address: {}", cfg.admin.email));
    }
    if cfg.admin.password.chars().count() < 8 {
        return Err(anyhow::anyhow!("admin.password must be at least 8 characters"));
    }
    if cfg.admin.password == DEFAULT_ADMIN_PASSWORD {
        tracing::warn!("admin.password is the shipped default - set FEEDAI__ADMIN__PASSWORD");
    }

    Ok(())
}

pub fn ensure_sqlite_parent_dir(url: &str) -> anyhow::Result<()> {
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .map(|p| p.split('?').next().unwrap_or(p));
    if let Some(path) = path {
        if path.is_empty() || path.starts_with(":memory:") {
            return Ok(());
        }
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }
    Ok(())
}
