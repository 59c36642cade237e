use actix_web::{web, HttpResponse};

use super::lists::ListDetail;
use super::AppState;
use crate::cache;
use crate::error::ApiResult;
use crate::models::{ApiResponse, Wish};

/// Shared list page. No login; the share uuid is the capability.
pub async fn get_shared_list(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let list = state.store.get_wish_list_by_share_uuid(&path.into_inner())?;
    let key = cache::public_list_key(&list.id);
    // Owner is read fresh; profile edits only sweep user keys
    let wishes: Vec<Wish> = state.cache.remember(&key, None, || state.store.list_wishes(&list.id))?;
    let owner = state.store.get_user(&list.user_id)?.public();
    Ok(HttpResponse::Ok().json(ApiResponse::success(ListDetail { list, wishes, owner })))
}
