use actix_web::{web, HttpResponse};
use serde::Serialize;

use super::{AppState, PageQuery};
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::events::DomainEvent;
use crate::models::*;

/// A list with its wishes and owner, as shown on a list page
#[derive(Debug, Serialize)]
pub(super) struct ListDetail {
    #[serde(flatten)]
    pub list: WishList,
    pub wishes: Vec<Wish>,
    pub owner: PublicUser,
}

impl AppState {
    pub(super) fn list_detail(&self, list: WishList) -> ApiResult<ListDetail> {
        let wishes = self.store.list_wishes(&list.id)?;
        let owner = self.store.get_user(&list.user_id)?.public();
        Ok(ListDetail { list, wishes, owner })
    }
}

// ==================== Wish List Endpoints ====================

pub async fn list_own_lists(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    query: web::Query<PageQuery>,
) -> ApiResult<HttpResponse> {
    let (limit, offset) = (query.limit(), query.offset());
    let items = state.store.list_wish_lists(&auth_user.user_id, false, limit, offset)?;
    let total = state.store.count_wish_lists(&auth_user.user_id, false)?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(PaginatedResponse {
        items,
        total,
        limit,
        offset,
    })))
}

/// Another user's lists: all of them for friends, public ones otherwise
pub async fn list_user_lists(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> ApiResult<HttpResponse> {
    let owner = state.store.get_user(&path.into_inner())?;
    let public_only = owner.id != auth_user.user_id && !state.is_friend(&auth_user.user_id, &owner.id)?;

    let (limit, offset) = (query.limit(), query.offset());
    let items = state.store.list_wish_lists(&owner.id, public_only, limit, offset)?;
    let total = state.store.count_wish_lists(&owner.id, public_only)?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(PaginatedResponse {
        items,
        total,
        limit,
        offset,
    })))
}

pub async fn create_list(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    body: web::Json<CreateWishListRequest>,
) -> ApiResult<HttpResponse> {
    body.validate()?;

    let mut list = WishList::new(&auth_user.user_id, body.name.trim());
    list.description = body.description.clone();
    list.is_public = body.is_public;
    state.store.create_wish_list(&mut list)?;
    state.forget_user(&auth_user.user_id);

    state
        .events
        .dispatch(DomainEvent::WishListCreated {
            user_id: auth_user.user_id.clone(),
            wish_list_id: list.id.clone(),
        })
        .await;

    Ok(HttpResponse::Created().json(ApiResponse::success(list)))
}

pub async fn get_list(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let list = state.visible_list(&auth_user.user_id, &path.into_inner())?;
    let detail = state.list_detail(list)?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(detail)))
}

pub async fn update_list(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    path: web::Path<String>,
    body: web::Json<UpdateWishListRequest>,
) -> ApiResult<HttpResponse> {
    body.validate()?;

    let mut list = state.owned_list(&auth_user.user_id, &path.into_inner())?;
    if let Some(ref name) = body.name {
        list.name = name.trim().to_string();
    }
    if let Some(ref description) = body.description {
        list.description = description.clone();
    }

    state.store.update_wish_list(&mut list)?;
    state.forget_list(&list.id);
    Ok(HttpResponse::Ok().json(ApiResponse::success(list)))
}

pub async fn delete_list(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let list = state.owned_list(&auth_user.user_id, &path.into_inner())?;
    state.store.delete_wish_list(&list.id)?;
    state.forget_list(&list.id);
    state.forget_user(&auth_user.user_id);
    log::info!("Deleted wish list {} with {} wish(es)", list.id, list.wish_count);
    Ok(HttpResponse::NoContent().finish())
}

pub async fn share_list(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let list = state.owned_list(&auth_user.user_id, &path.into_inner())?;
    let list = state.store.set_wish_list_public(&list.id, true)?;
    state.forget_list(&list.id);
    Ok(HttpResponse::Ok().json(ApiResponse::success(list)))
}

pub async fn unshare_list(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let list = state.owned_list(&auth_user.user_id, &path.into_inner())?;
    let list = state.store.set_wish_list_public(&list.id, false)?;
    state.forget_list(&list.id);
    Ok(HttpResponse::Ok().json(ApiResponse::success(list)))
}
