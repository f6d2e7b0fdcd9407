use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use sqlx::{QueryBuilder, Sqlite};

use crate::{
    db,
    error::{
        validation::{normalize_email, validate_name, validate_password},
        AppError, AppResult, OptionExt,
    },
    extract::{AppJson, AppPath, AppQuery},
    middleware::{AdminUser, AuthUser},
    security::hash_password,
    state::AppState,
    types::{now_unix, CreateUserRequest, PageQuery, Role, UpdateUserRequest, UserDto, UserPage, UserRow},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/{id}", get(get_user).patch(update_user).delete(delete_user))
}

pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
    AppQuery(page): AppQuery<PageQuery>,
) -> AppResult<Json<UserPage>> {
    let (limit, offset) = page.clamped();
    let total_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users").fetch_one(&state.db).await?;
    let rows = sqlx::query_as::<_, UserRow>("SELECT * FROM users ORDER BY id LIMIT ?1 OFFSET ?2")
        .bind(limit)
        .bind(offset)
        .fetch_all(&state.db)
        .await?;
    Ok(Json(UserPage { items: rows.into_iter().map(UserDto::from).collect(), total_count, limit, offset }))
}

/// Admin-side creation; unlike registration, the role can be chosen.
pub async fn create_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    AppJson(req): AppJson<CreateUserRequest>,
) -> AppResult<impl IntoResponse> {
    let name = validate_name(&req.name)?;
    let email = normalize_email(&req.email)?;
    validate_password(&req.password)?;
    let role = req.role.unwrap_or(Role::User);

    if db::find_user_by_email(&state.db, &email).await?.is_some() {
        return Err(AppError::Conflict("Email is already registered".to_string()));
    }
    let password_hash = hash_password(&req.password).await?;
    let user = db::insert_user(&state.db, &name, &email, &password_hash, role).await?;
    state.metrics.inc_users_created();
    tracing::info!(user_id = user.id, role = role.as_str(), by = admin.user.id, "User created");

    Ok((StatusCode::CREATED, Json(UserDto::from(user))))
}

fn ensure_self_or_admin(caller: &UserRow, target_id: i64) -> AppResult<()> {
    if caller.id == target_id || caller.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Not allowed to access this user".to_string()))
    }
}

pub async fn get_user(
    State(state): State<AppState>,
    auth: AuthUser,
    AppPath(id): AppPath<i64>,
) -> AppResult<Json<UserDto>> {
    ensure_self_or_admin(&auth.user, id)?;
    let user = db::find_user_by_id(&state.db, id).await?.ok_or_not_found("User")?;
    Ok(Json(UserDto::from(user)))
}

pub async fn update_user(
    State(state): State<AppState>,
    auth: AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(req): AppJson<UpdateUserRequest>,
) -> AppResult<Json<UserDto>> {
    ensure_self_or_admin(&auth.user, id)?;
    if req.touches_privileges() && !auth.user.is_admin() {
        return Err(AppError::Forbidden("Only administrators can change role or status".to_string()));
    }
    if auth.user.id == id && (req.role == Some(Role::User) || req.is_active == Some(false)) {
        return Err(AppError::Conflict("Administrators cannot demote or deactivate themselves".to_string()));
    }
    let existing = db::find_user_by_id(&state.db, id).await?.ok_or_not_found("User")?;

    let mut qb = QueryBuilder::<Sqlite>::new("UPDATE users SET updated_at = ");
    qb.push_bind(now_unix());
    if let Some(name) = &req.name {
        let name = validate_name(name)?;
        qb.push(", name_search = ").push_bind(db::search_key(&name));
        qb.push(", name = ").push_bind(name);
    }
    if let Some(email) = &req.email {
        let email = normalize_email(email)?;
        if email != existing.email && db::find_user_by_email(&state.db, &email).await?.is_some() {
            return Err(AppError::Conflict("Email is already registered".to_string()));
        }
        qb.push(", email = ").push_bind(email);
    }
    if let Some(password) = &req.password {
        validate_password(password)?;
        qb.push(", password_hash = ").push_bind(hash_password(password).await?);
    }
    if let Some(role) = req.role {
        qb.push(", role = ").push_bind(role.as_str());
    }
    if let Some(is_active) = req.is_active {
        qb.push(", is_active = ").push_bind(is_active);
    }
    qb.push(" WHERE id = ").push_bind(id).push(" RETURNING *");

    let updated = qb.build_query_as::<UserRow>().fetch_one(&state.db).await?;

    // Password changes and deactivation invalidate every outstanding token of the user.
    if req.password.is_some() || req.is_active == Some(false) {
        let revoked = db::delete_user_sessions(&state.db, id).await?;
        state.metrics.add_sessions_revoked(revoked);
    }
    tracing::info!(user_id = id, by = auth.user.id, "User updated");
    Ok(Json(UserDto::from(updated)))
}

pub async fn delete_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    AppPath(id): AppPath<i64>,
) -> AppResult<StatusCode> {
    if admin.user.id == id {
        return Err(AppError::Conflict("Administrators cannot delete themselves".to_string()));
    }
    let res = sqlx::query("DELETE FROM users WHERE id = ?1").bind(id).execute(&state.db).await?;
    if res.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }
    tracing::info!(user_id = id, by = admin.user.id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}
