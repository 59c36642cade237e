use actix_web::{web, HttpResponse};
use serde::Serialize;

use super::AppState;
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::events::DomainEvent;
use crate::models::*;
use crate::policies;

#[derive(Serialize)]
struct WishView {
    #[serde(flatten)]
    wish: Wish,
    reserved_by_me: bool,
}

// ==================== Wish Endpoints ====================

pub async fn list_wishes(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let list = state.visible_list(&auth_user.user_id, &path.into_inner())?;
    let wishes = state.store.list_wishes(&list.id)?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(wishes)))
}

pub async fn create_wish(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    path: web::Path<String>,
    body: web::Json<CreateWishRequest>,
) -> ApiResult<HttpResponse> {
    body.validate()?;
    let list = state.owned_list(&auth_user.user_id, &path.into_inner())?;

    let body = body.into_inner();
    let mut wish = Wish::new(&list, body.title.trim());
    wish.description = body.description;
    wish.url = body.url;
    wish.price = body.price;
    wish.image_url = body.image_url;
    wish.priority = body.priority;

    state.store.create_wish(&mut wish)?;
    state.forget_list(&list.id);
    state.forget_user(&auth_user.user_id);

    state
        .events
        .dispatch(DomainEvent::WishCreated {
            user_id: auth_user.user_id.clone(),
            wish_id: wish.id.clone(),
        })
        .await;

    Ok(HttpResponse::Created().json(ApiResponse::success(wish)))
}

pub async fn get_wish(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let (wish, _) = state.visible_wish(&auth_user.user_id, &path.into_inner())?;

    // The owner only learns that a wish is taken, never by whom
    let reserved_by_me = wish.is_reserved
        && wish.user_id != auth_user.user_id
        && state
            .store
            .get_reservation_for_wish(&wish.id)?
            .is_some_and(|r| r.user_id == auth_user.user_id);

    Ok(HttpResponse::Ok().json(ApiResponse::success(WishView { wish, reserved_by_me })))
}

pub async fn update_wish(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    path: web::Path<String>,
    body: web::Json<UpdateWishRequest>,
) -> ApiResult<HttpResponse> {
    body.validate()?;

    let (mut wish, _) = state.visible_wish(&auth_user.user_id, &path.into_inner())?;
    if !policies::can_edit_wish(&auth_user.user_id, &wish) {
        return Err(ApiError::Forbidden("Only the owner can change this wish".to_string()));
    }

    let body = body.into_inner();
    if let Some(title) = body.title {
        wish.title = title.trim().to_string();
    }
    if let Some(description) = body.description {
        wish.description = description;
    }
    if let Some(url) = body.url {
        wish.url = Some(url).filter(|u| !u.is_empty());
    }
    if let Some(image_url) = body.image_url {
        wish.image_url = Some(image_url).filter(|u| !u.is_empty());
    }
    if let Some(price) = body.price {
        wish.price = price;
    }
    if let Some(priority) = body.priority {
        wish.priority = priority;
    }

    state.store.update_wish(&mut wish)?;
    state.forget_list(&wish.wish_list_id);
    Ok(HttpResponse::Ok().json(ApiResponse::success(wish)))
}

pub async fn delete_wish(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let (wish, _) = state.visible_wish(&auth_user.user_id, &path.into_inner())?;
    if !policies::can_edit_wish(&auth_user.user_id, &wish) {
        return Err(ApiError::Forbidden("Only the owner can delete this wish".to_string()));
    }

    let reserver = state.store.get_reservation_for_wish(&wish.id)?.map(|r| r.user_id);
    state.store.delete_wish(&wish.id)?;
    state.forget_list(&wish.wish_list_id);
    state.forget_user(&auth_user.user_id);
    if let Some(reserver) = reserver {
        state.forget_user(&reserver);
    }
    Ok(HttpResponse::NoContent().finish())
}

// ==================== Reservation Endpoints ====================

pub async fn reserve_wish(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let (wish, list) = state.visible_wish(&auth_user.user_id, &path.into_inner())?;
    let friends = state.is_friend(&auth_user.user_id, &list.user_id)?;
    if !policies::can_reserve(&auth_user.user_id, &wish, &list, friends) {
        return Err(ApiError::Forbidden("You cannot reserve your own wish".to_string()));
    }

    let reservation = state.store.reserve_wish(&wish.id, &auth_user.user_id)?;
    state.forget_list(&list.id);
    state.forget_user(&wish.user_id);
    state.forget_user(&auth_user.user_id);

    state
        .events
        .dispatch(DomainEvent::WishReserved {
            wish_id: wish.id.clone(),
            owner_id: wish.user_id.clone(),
            reserver_id: auth_user.user_id.clone(),
        })
        .await;

    Ok(HttpResponse::Created().json(ApiResponse::success(reservation)))
}

pub async fn cancel_reservation(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let wish = state.store.get_wish(&path.into_inner())?;
    state.store.cancel_reservation(&wish.id, &auth_user.user_id)?;
    state.forget_list(&wish.wish_list_id);
    state.forget_user(&wish.user_id);
    state.forget_user(&auth_user.user_id);

    state
        .events
        .dispatch(DomainEvent::ReservationCancelled {
            wish_id: wish.id.clone(),
            owner_id: wish.user_id.clone(),
            reserver_id: auth_user.user_id.clone(),
        })
        .await;

    Ok(HttpResponse::NoContent().finish())
}

pub async fn list_reservations(
    state: web::Data<AppState>,
    auth_user: AuthUser,
) -> ApiResult<HttpResponse> {
    let reservations = state.store.list_reservations_by_user(&auth_user.user_id)?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(reservations)))
}
