use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use super::{AppState, PageQuery};
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::models::*;

#[derive(Deserialize)]
pub struct NotificationsQuery {
    #[serde(default)]
    unread: bool,
    limit: Option<i64>,
    offset: Option<i64>,
}

#[derive(Serialize)]
struct NotificationPage {
    notifications: Vec<Notification>,
    total: i64,
    unread: i64,
}

// ==================== Notification Endpoints ====================

pub async fn list_notifications(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    query: web::Query<NotificationsQuery>,
) -> ApiResult<HttpResponse> {
    let page = PageQuery {
        limit: query.limit,
        offset: query.offset,
    };
    let notifications = state.store.list_notifications(
        &auth_user.user_id,
        query.unread,
        page.limit(),
        page.offset(),
    )?;
    let total = state.store.count_notifications(&auth_user.user_id, query.unread)?;
    let unread = state.store.count_notifications(&auth_user.user_id, true)?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(NotificationPage {
        notifications,
        total,
        unread,
    })))
}

pub async fn mark_read(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    state
        .store
        .mark_notification_read(&path.into_inner(), &auth_user.user_id)?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn mark_all_read(
    state: web::Data<AppState>,
    auth_user: AuthUser,
) -> ApiResult<HttpResponse> {
    let updated = state.store.mark_all_notifications_read(&auth_user.user_id)?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(serde_json::json!({ "updated": updated }))))
}

pub async fn delete_notification(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    state
        .store
        .delete_notification(&path.into_inner(), &auth_user.user_id)?;
    Ok(HttpResponse::NoContent().finish())
}
