use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite};

use crate::{
    db,
    error::{AppError, AppResult},
    extract::AppQuery,
    middleware::AuthUser,
    state::AppState,
    types::{default_page_limit, PageQuery, Role, UserDto, UserRow},
};

pub fn router() -> Router<AppState> {
    Router::new().route("/search/users", get(search_users))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    #[serde(default = "default_page_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResult {
    pub items: Vec<UserDto>,
    pub total_count: i64,
    pub query: String,
}

const LIKE_ESCAPE: char = '!';
const MAX_TERM_CHARS: usize = 100;

pub fn escape_like_pattern(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | LIKE_ESCAPE) {
            out.push(LIKE_ESCAPE);
        }
        out.push(ch);
    }
    out
}

pub fn sanitize_search_term(raw: &str) -> Result<String, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput("Search query cannot be empty".to_string()));
    }
    if trimmed.chars().count() > MAX_TERM_CHARS {
        return Err(AppError::InvalidInput("Search query too long".to_string()));
    }
    let sanitized: String = trimmed.chars().filter(|ch| !ch.is_control()).collect();
    if sanitized.trim().is_empty() {
        return Err(AppError::InvalidInput("Search query contains only control characters".to_string()));
    }
    Ok(sanitized)
}

fn push_filters<'a>(qb: &mut QueryBuilder<'a, Sqlite>, pattern: &'a str, role: Option<Role>) {
    qb.push(" WHERE (name_search LIKE ")
        .push_bind(pattern)
        .push(" ESCAPE '!' OR email LIKE ")
        .push_bind(pattern)
        .push(" ESCAPE '!')");
    if let Some(role) = role {
        qb.push(" AND role = ").push_bind(role.as_str());
    }
}

/// Case-insensitive substring match on name or email, ordered by lower-cased name then id.
///
/// Both stored columns are lower-cased in Rust (`name_search`, normalized `email`), so the
/// match folds non-ASCII letters too; SQLite's own `LIKE` folds ASCII only.
pub async fn search_users(
    State(state): State<AppState>,
    _auth: AuthUser,
    AppQuery(query): AppQuery<SearchQuery>,
) -> AppResult<Json<SearchResult>> {
    let term = sanitize_search_term(&query.q)?;
    let pattern = format!("%{}%", escape_like_pattern(&db::search_key(&term)));
    let (limit, offset) = PageQuery { limit: query.limit, offset: query.offset }.clamped();

    let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM users");
    push_filters(&mut count_qb, &pattern, query.role);
    let total_count: i64 = count_qb.build_query_scalar().fetch_one(&state.db).await?;

    let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM users");
    push_filters(&mut qb, &pattern, query.role);
    qb.push(" ORDER BY name_search, id LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);
    let rows = qb.build_query_as::<UserRow>().fetch_all(&state.db).await?;

    state.metrics.inc_searches();
    Ok(Json(SearchResult { items: rows.into_iter().map(UserDto::from).collect(), total_count, query: term }))
}
