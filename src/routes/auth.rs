use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use crate::{
    db,
    error::{
        validation::{normalize_email, validate_name, validate_password},
        AppError, AppResult,
    },
    extract::AppJson,
    middleware::{AuthUser, ClientIp},
    security::{hash_password, hash_token, new_token, verify_password, DUMMY_PASSWORD_HASH},
    state::AppState,
    types::{format_unix, now_unix, LoginRequest, RegisterRequest, Role, TokenResponse, UserDto},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
}

/// Self-service sign-up; always creates a `user` role account.
pub async fn register(
    State(state): State<AppState>,
    AppJson(req): AppJson<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    let name = validate_name(&req.name)?;
    let email = normalize_email(&req.email)?;
    validate_password(&req.password)?;

    if db::find_user_by_email(&state.db, &email).await?.is_some() {
        return Err(AppError::Conflict("Email is already registered".to_string()));
    }
    let password_hash = hash_password(&req.password).await?;
    let user = db::insert_user(&state.db, &name, &email, &password_hash, Role::User).await?;
    state.metrics.inc_users_created();
    tracing::info!(user_id = user.id, "User registered");

    Ok((StatusCode::CREATED, Json(UserDto::from(user))))
}

/// Exchanges email and password for a bearer token.
///
/// Unknown email, wrong password and deactivated accounts all produce the same `401`.
pub async fn login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    AppJson(req): AppJson<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    state.login_limiter.check(ip).await?;

    let email = req.email.trim().to_lowercase();
    let user = db::find_user_by_email(&state.db, &email).await?.filter(|user| user.is_active);
    // Unknown and inactive accounts still pay for one argon2 run, like a wrong password does.
    let stored_hash: &str = match &user {
        Some(user) => &user.password_hash,
        None => DUMMY_PASSWORD_HASH,
    };
    let verified = verify_password(&req.password, stored_hash).await?;
    let user = match user {
        Some(user) if verified => user,
        other => {
            state.metrics.inc_logins_failed();
            tracing::info!(%ip, user_id = other.map(|user| user.id), "Login rejected");
            return Err(AppError::Unauthorized("Incorrect email or password".to_string()));
        }
    };

    let token = new_token();
    let expires_at = now_unix().saturating_add(state.config.auth.token_ttl_minutes.saturating_mul(60));
    db::insert_session(&state.db, &hash_token(&token), user.id, expires_at).await?;
    state.metrics.inc_logins_succeeded();
    tracing::info!(user_id = user.id, "Login succeeded");

    Ok(Json(TokenResponse {
        access_token: token,
        token_type: "bearer".to_string(),
        expires_at: format_unix(expires_at),
        user: UserDto::from(user),
    }))
}

/// Revokes the presented token only; other sessions of the user stay valid.
pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> AppResult<StatusCode> {
    let revoked = db::delete_session(&state.db, &auth.token_hash).await?;
    state.metrics.add_sessions_revoked(revoked);
    tracing::info!(user_id = auth.user.id, "Logged out");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(auth: AuthUser) -> Json<UserDto> {
    Json(UserDto::from(auth.user))
}
