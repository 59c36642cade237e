use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::events::DomainEvent;
use crate::models::*;
use crate::store::SendOutcome;

#[derive(Deserialize)]
pub struct RequestsQuery {
    direction: Option<String>,
}

#[derive(Serialize)]
struct SendResult {
    request: FriendRequest,
    auto_accepted: bool,
}

// ==================== Friend Endpoints ====================

pub async fn list_friends(
    state: web::Data<AppState>,
    auth_user: AuthUser,
) -> ApiResult<HttpResponse> {
    let friends = state.store.list_friends(&auth_user.user_id)?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(friends)))
}

pub async fn remove_friend(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let friend_id = path.into_inner();
    state.store.remove_friend(&auth_user.user_id, &friend_id)?;
    state.forget_user(&auth_user.user_id);
    state.forget_user(&friend_id);
    Ok(HttpResponse::NoContent().finish())
}

// ==================== Friend Request Endpoints ====================

pub async fn list_requests(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    query: web::Query<RequestsQuery>,
) -> ApiResult<HttpResponse> {
    let requests = match query.direction.as_deref() {
        None | Some("incoming") => state.store.list_incoming_requests(&auth_user.user_id)?,
        Some("outgoing") => state.store.list_outgoing_requests(&auth_user.user_id)?,
        Some(other) => {
            return Err(ApiError::BadRequest(format!(
                "Invalid direction: {} (expected incoming or outgoing)",
                other
            )))
        }
    };
    Ok(HttpResponse::Ok().json(ApiResponse::success(requests)))
}

pub async fn send_request(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    body: web::Json<SendFriendRequest>,
) -> ApiResult<HttpResponse> {
    let receiver_id = match (&body.receiver_id, &body.username) {
        (Some(id), _) => id.clone(),
        (None, Some(username)) => state.store.get_user_by_username(username.trim())?.id,
        (None, None) => {
            return Err(ApiError::BadRequest("receiver_id or username is required".to_string()));
        }
    };

    let outcome = state.store.send_friend_request(&auth_user.user_id, &receiver_id)?;
    let request = outcome.request().clone();
    let auto_accepted = outcome.auto_accepted();

    let event = match outcome {
        SendOutcome::AutoAccepted(_) => {
            log::info!("Friend request {} accepted by counter-request", request.id);
            state.forget_user(&request.sender_id);
            state.forget_user(&request.receiver_id);
            DomainEvent::FriendRequestAccepted {
                request_id: request.id.clone(),
                sender_id: request.sender_id.clone(),
                receiver_id: request.receiver_id.clone(),
            }
        }
        SendOutcome::Sent(_) | SendOutcome::Resent(_) => DomainEvent::FriendRequestSent {
            request_id: request.id.clone(),
            sender_id: request.sender_id.clone(),
            receiver_id: request.receiver_id.clone(),
        },
    };
    state.events.dispatch(event).await;

    let mut response = if auto_accepted {
        HttpResponse::Ok()
    } else {
        HttpResponse::Created()
    };
    Ok(response.json(ApiResponse::success(SendResult {
        request,
        auto_accepted,
    })))
}

pub async fn accept_request(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let request = state
        .store
        .accept_friend_request(&path.into_inner(), &auth_user.user_id)?;
    state.forget_user(&request.sender_id);
    state.forget_user(&request.receiver_id);

    state
        .events
        .dispatch(DomainEvent::FriendRequestAccepted {
            request_id: request.id.clone(),
            sender_id: request.sender_id.clone(),
            receiver_id: request.receiver_id.clone(),
        })
        .await;

    Ok(HttpResponse::Ok().json(ApiResponse::success(request)))
}

pub async fn decline_request(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let request = state
        .store
        .decline_friend_request(&path.into_inner(), &auth_user.user_id)?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(request)))
}

pub async fn cancel_request(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    state
        .store
        .cancel_friend_request(&path.into_inner(), &auth_user.user_id)?;
    Ok(HttpResponse::NoContent().finish())
}
