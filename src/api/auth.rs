use actix_web::{web, HttpResponse};

use super::AppState;
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::models::*;
use crate::store::StoreError;

// ==================== Auth Endpoints ====================

pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterRequest>,
) -> ApiResult<HttpResponse> {
    body.validate()?;

    let password_hash = state.auth_service.hash_password(&body.password)?;
    let mut user = User::new(body.username.trim(), body.email.trim(), password_hash);
    if let Some(ref display_name) = body.display_name {
        user.display_name = display_name.trim().to_string();
    }

    state.store.create_user(&mut user)?;
    log::info!("Registered user {} ({})", user.username, user.id);

    let token = state.auth_service.generate_token(&user.id)?;
    Ok(HttpResponse::Created().json(ApiResponse::success(LoginResponse { token, user })))
}

pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> ApiResult<HttpResponse> {
    let invalid = || ApiError::Unauthorized("Invalid credentials".to_string());

    let user = match state.store.get_user_by_username(body.username.trim()) {
        Ok(u) => u,
        Err(StoreError::NotFound(_)) => return Err(invalid()),
        Err(e) => return Err(e.into()),
    };

    let valid = state
        .auth_service
        .verify_password(&body.password, &user.password_hash)
        .unwrap_or(false);
    if !valid {
        return Err(invalid());
    }

    let token = state.auth_service.generate_token(&user.id)?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(LoginResponse { token, user })))
}

pub async fn get_current_user(
    state: web::Data<AppState>,
    auth_user: AuthUser,
) -> ApiResult<HttpResponse> {
    let user = state.store.get_user(&auth_user.user_id)?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(user)))
}

pub async fn update_profile(
    state: web::Data<AppState>,
    auth_user: AuthUser,
    body: web::Json<UpdateProfileRequest>,
) -> ApiResult<HttpResponse> {
    body.validate()?;

    let mut user = state.store.get_user(&auth_user.user_id)?;
    if let Some(ref display_name) = body.display_name {
        user.display_name = display_name.trim().to_string();
    }
    if let Some(ref bio) = body.bio {
        user.bio = bio.clone();
    }
    if let Some(ref avatar_url) = body.avatar_url {
        user.avatar_url = avatar_url.clone();
    }

    state.store.update_user(&mut user)?;
    state.forget_user(&user.id);
    Ok(HttpResponse::Ok().json(ApiResponse::success(user)))
}
