use actix_web::{web, HttpResponse, Responder};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

use crate::auth::AuthService;
use crate::cache::{self, Cache};
use crate::error::{ApiError, ApiResult};
use crate::events::EventDispatcher;
use crate::models::{Wish, WishList};
use crate::policies;
use crate::store::Store;

mod achievements;
mod auth;
mod friends;
mod lists;
mod notifications;
mod public;
mod users;
mod wishes;

pub struct AppState {
    pub store: Arc<Store>,
    pub auth_service: Arc<AuthService>,
    pub events: EventDispatcher,
    pub cache: Cache,
}

impl AppState {
    /// List the viewer may see. Lists they may not see are reported as
    /// missing so private lists do not leak their existence.
    pub(crate) fn visible_list(&self, viewer_id: &str, list_id: &str) -> ApiResult<WishList> {
        let list = self.store.get_wish_list(list_id)?;
        if !policies::can_view_list(viewer_id, &list, self.is_friend(viewer_id, &list.user_id)?) {
            return Err(ApiError::NotFound(format!("Wish list {} not found", list_id)));
        }
        Ok(list)
    }

    pub(crate) fn owned_list(&self, user_id: &str, list_id: &str) -> ApiResult<WishList> {
        let list = self.visible_list(user_id, list_id)?;
        if !policies::can_edit_list(user_id, &list) {
            return Err(ApiError::Forbidden("Only the owner can change this list".to_string()));
        }
        Ok(list)
    }

    /// Wish together with its list, if the viewer may see the list
    pub(crate) fn visible_wish(&self, viewer_id: &str, wish_id: &str) -> ApiResult<(Wish, WishList)> {
        let wish = self.store.get_wish(wish_id)?;
        let list = self
            .visible_list(viewer_id, &wish.wish_list_id)
            .map_err(|e| match e {
                ApiError::NotFound(_) => ApiError::NotFound(format!("Wish {} not found", wish_id)),
                other => other,
            })?;
        Ok((wish, list))
    }

    pub(crate) fn is_friend(&self, user_id: &str, other_id: &str) -> ApiResult<bool> {
        if user_id == other_id {
            return Ok(false);
        }
        Ok(self.store.are_friends(user_id, other_id)?)
    }

    pub(crate) fn forget_user(&self, user_id: &str) {
        self.cache.forget_pattern(&cache::user_pattern(user_id));
    }

    pub(crate) fn forget_list(&self, list_id: &str) {
        self.cache.forget_pattern(&cache::list_pattern(list_id));
    }
}

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PageQuery {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

// ==================== Health Check ====================

pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339()
    }))
}

// ==================== Route Configuration ====================

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg
        // Health check
        .route("/health", web::get().to(health))

        // Auth routes (no auth required)
        .route("/api/auth/register", web::post().to(auth::register))
        .route("/api/auth/login", web::post().to(auth::login))

        // Current user
        .route("/api/auth/me", web::get().to(auth::get_current_user))
        .route("/api/auth/me", web::put().to(auth::update_profile))
        .route("/api/stats", web::get().to(users::get_stats))

        // Users
        .route("/api/users", web::get().to(users::search_users))
        .route("/api/users/{id}", web::get().to(users::get_user))
        .route("/api/users/{id}/lists", web::get().to(lists::list_user_lists))

        // Wish lists
        .route("/api/lists", web::get().to(lists::list_own_lists))
        .route("/api/lists", web::post().to(lists::create_list))
        .route("/api/lists/{id}", web::get().to(lists::get_list))
        .route("/api/lists/{id}", web::put().to(lists::update_list))
        .route("/api/lists/{id}", web::delete().to(lists::delete_list))
        .route("/api/lists/{id}/share", web::post().to(lists::share_list))
        .route("/api/lists/{id}/share", web::delete().to(lists::unshare_list))
        .route("/api/lists/{id}/wishes", web::get().to(wishes::list_wishes))
        .route("/api/lists/{id}/wishes", web::post().to(wishes::create_wish))

        // Wishes and reservations
        .route("/api/wishes/{id}", web::get().to(wishes::get_wish))
        .route("/api/wishes/{id}", web::put().to(wishes::update_wish))
        .route("/api/wishes/{id}", web::delete().to(wishes::delete_wish))
        .route("/api/wishes/{id}/reserve", web::post().to(wishes::reserve_wish))
        .route("/api/wishes/{id}/reserve", web::delete().to(wishes::cancel_reservation))
        .route("/api/reservations", web::get().to(wishes::list_reservations))

        // Friends
        .route("/api/friends", web::get().to(friends::list_friends))
        .route("/api/friends/{user_id}", web::delete().to(friends::remove_friend))
        .route("/api/friend-requests", web::get().to(friends::list_requests))
        .route("/api/friend-requests", web::post().to(friends::send_request))
        .route("/api/friend-requests/{id}/accept", web::post().to(friends::accept_request))
        .route("/api/friend-requests/{id}/decline", web::post().to(friends::decline_request))
        .route("/api/friend-requests/{id}", web::delete().to(friends::cancel_request))

        // Notifications
        .route("/api/notifications", web::get().to(notifications::list_notifications))
        .route("/api/notifications/read-all", web::post().to(notifications::mark_all_read))
        .route("/api/notifications/{id}/read", web::post().to(notifications::mark_read))
        .route("/api/notifications/{id}", web::delete().to(notifications::delete_notification))

        // Achievements
        .route("/api/achievements", web::get().to(achievements::list_achievements))

        // Public share links (no auth)
        .route("/api/public/lists/{share_uuid}", web::get().to(public::get_shared_list));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_query_bounds() {
        let page = PageQuery { limit: None, offset: None };
        assert_eq!(page.limit(), DEFAULT_PAGE_SIZE);
        assert_eq!(page.offset(), 0);

        let page = PageQuery { limit: Some(500), offset: Some(-3) };
        assert_eq!(page.limit(), MAX_PAGE_SIZE);
        assert_eq!(page.offset(), 0);

        let page = PageQuery { limit: Some(0), offset: Some(10) };
        assert_eq!(page.limit(), 1);
        assert_eq!(page.offset(), 10);
    }
}
