//! Request guards and per-client throttling.
//!
//! - `auth`: bearer-token extractors ([`AuthUser`], [`AdminUser`]) used as handler arguments
//! - `ip`: client IP resolution behind proxies
//! - `rate_limit`: sliding-window limiter applied to the login endpoint

pub mod auth;
pub mod ip;
pub mod rate_limit;

pub use auth::{AdminUser, AuthUser};
pub use ip::ClientIp;
pub use rate_limit::RateLimiter;
