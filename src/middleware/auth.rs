use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{
    db,
    error::AppError,
    security::{bearer_token, hash_token},
    state::AppState,
    types::{now_unix, UserRow},
};

/// The caller behind a valid `Authorization: Bearer <token>` header.
///
/// Used as a handler argument, it resolves the token before the handler body runs; a missing,
/// unknown, expired or revoked token, or a deactivated account, rejects the request with
/// `401 Unauthorized`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: UserRow,
    /// Digest of the presented token, used to revoke exactly this session on logout.
    pub token_hash: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or_else(AppError::unauthorized)?;
        let token_hash = hash_token(token);
        match db::find_session_user(&state.db, &token_hash, now_unix()).await? {
            Some(user) => Ok(AuthUser { user, token_hash }),
            None => {
                tracing::debug!("Rejected bearer token: unknown, expired or inactive owner");
                Err(AppError::unauthorized())
            }
        }
    }
}

/// An [`AuthUser`] whose role is `admin`; other callers get `403 Forbidden`.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;
        if !auth.user.is_admin() {
            return Err(AppError::Forbidden("Administrator role required".to_string()));
        }
        Ok(AdminUser(auth))
    }
}
