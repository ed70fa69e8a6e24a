// src/auth_handlers.rs
use actix_web::{web, HttpRequest, HttpResponse};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use std::sync::Arc;
use validator::Validate;

use crate::auth::{get_current_user, AuthService, LoginRequest, LoginResponse, UserCredential};
use crate::error::{ApiError, ApiResult};
use crate::token_revocation;
use crate::AppState;

// ======== AUTH HANDLERS ========

pub async fn login(
    app_state: web::Data<Arc<AppState>>,
    auth_service: web::Data<Arc<AuthService>>,
    request: web::Json<LoginRequest>,
) -> ApiResult<HttpResponse> {
    request.validate()?;

    let user = UserCredential::find_by_username(&app_state.db_pool, &request.username)
        .await?
        .ok_or_else(|| {
            log::warn!("Login attempt for unknown user {}", request.username);
            ApiError::invalid_credentials()
        })?;

    if !auth_service.verify_password(&request.password, &user.password)
        .map_err(|_| ApiError::InternalServerError("Password verification failed".to_string()))?
    {
        log::warn!("Failed login for {}", user.username);
        return Err(ApiError::invalid_credentials());
    }

    let jwtoken = auth_service.generate_token(&user)?;

    log::info!("User {} logged in successfully", user.username);

    Ok(HttpResponse::Ok().json(LoginResponse {
        jwtoken,
        expires_in: auth_service.token_ttl_seconds(),
    }))
}

/// Username carried by the presented token, as plain text.
pub async fn me(
    auth_service: web::Data<Arc<AuthService>>,
    credentials: BearerAuth,
) -> ApiResult<HttpResponse> {
    let username = auth_service.username_from_token(credentials.token())?;
    Ok(HttpResponse::Ok().content_type("text/plain; charset=utf-8").body(username))
}

pub async fn logout(
    app_state: web::Data<Arc<AppState>>,
    http_request: HttpRequest,
) -> ApiResult<HttpResponse> {
    let claims = get_current_user(&http_request)?;

    token_revocation::revoke(&app_state.db_pool, &claims.jti, claims.exp).await?;
    log::info!("User {} logged out", claims.sub);

    Ok(HttpResponse::NoContent().finish())
}
