use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

use super::AppState;
use crate::achievements::{Achievement, CATALOG};
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::models::ApiResponse;

#[derive(Serialize)]
struct AchievementStatus {
    #[serde(flatten)]
    achievement: &'static Achievement,
    unlocked: bool,
    granted_at: Option<DateTime<Utc>>,
}

/// The whole catalog, each entry marked with whether the caller holds it
pub async fn list_achievements(
    state: web::Data<AppState>,
    auth_user: AuthUser,
) -> ApiResult<HttpResponse> {
    let granted: HashMap<String, DateTime<Utc>> = state
        .store
        .list_user_achievements(&auth_user.user_id)?
        .into_iter()
        .map(|a| (a.achievement_key, a.granted_at))
        .collect();

    let catalog: Vec<AchievementStatus> = CATALOG
        .iter()
        .map(|achievement| {
            let granted_at = granted.get(achievement.key).copied();
            AchievementStatus {
                achievement,
                unlocked: granted_at.is_some(),
                granted_at,
            }
        })
        .collect();

    Ok(HttpResponse::Ok().json(ApiResponse::success(catalog)))
}
