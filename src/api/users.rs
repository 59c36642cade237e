use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::auth::AuthUser;
use crate::cache;
use crate::error::ApiResult;
use crate::models::*;

const SEARCH_LIMIT: i64 = 20;

#[derive(Deserialize)]
pub struct SearchQuery {
    q: Option<String>,
}

#[derive(Serialize)]
struct UserProfile {
    user: PublicUser,
    is_friend: bool,
}

pub async fn get_stats(
    state: web::Data<AppState>,
    auth_user: AuthUser,
) -> ApiResult<HttpResponse> {
    let key = cache::user_stats_key(&auth_user.user_id);
    let stats = state
        .cache
        .remember(&key, None, || state.store.user_stats(&auth_user.user_id))?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(stats)))
}

/// Substring match on username and display name, never including the caller
pub async fn search_users(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    query: web::Query<SearchQuery>,
) -> ApiResult<HttpResponse> {
    let q = query.q.as_deref().map(str::trim).unwrap_or_default();
    if q.is_empty() {
        return Ok(HttpResponse::Ok().json(ApiResponse::success(Vec::<PublicUser>::new())));
    }

    let users = state.store.search_users(q, &auth_user.user_id, SEARCH_LIMIT)?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(users)))
}

pub async fn get_user(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let user = state.store.get_user(&path.into_inner())?;
    let is_friend = state.is_friend(&auth_user.user_id, &user.id)?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(UserProfile {
        user: user.public(),
        is_friend,
    })))
}
