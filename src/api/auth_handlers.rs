//! Authentication Handlers
//!
//! Email/password signup and login, token refresh, logout and the caller's
//! own profile with memberships.

use axum::{
    extract::State,
    http::{header::USER_AGENT, HeaderMap, StatusCode},
    Extension, Json,
};

use crate::{
    api::{
        handlers::{respond, ApiResponse, AppState},
        middleware::AuthUser,
    },
    models::{
        auth::TokenPair,
        requests::{AuthResponse, LoginRequest, MeResponse, RefreshTokenRequest, SignupRequest},
    },
    utils::{
        error::{AppError, AppResult},
        validation::format_validation_errors,
    },
};
use validator::Validate;

fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.chars().take(512).collect())
}

/// Create an account and sign it in
///
/// # Response
/// - `201 Created`: user and token pair
/// - `400 Bad Request`: invalid name, email or weak password
/// - `409 Conflict`: email already registered
pub async fn signup(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SignupRequest>,
) -> AppResult<(StatusCode, ApiResponse<AuthResponse>)> {
    let user = state.user_service.signup(request).await?;
    let tokens = state
        .jwt_service
        .generate_token_pair(user.id, user_agent(&headers))
        .await?;

    log::info!("New account {} signed up", user.id);
    Ok((StatusCode::CREATED, respond(AuthResponse { user, tokens })))
}

/// Sign in with email and password
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> AppResult<ApiResponse<AuthResponse>> {
    let user = state.user_service.authenticate(&request).await?;
    let tokens = state
        .jwt_service
        .generate_token_pair(user.id, user_agent(&headers))
        .await?;

    Ok(respond(AuthResponse { user, tokens }))
}

/// Exchange a refresh token for a new access token
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(request): Json<RefreshTokenRequest>,
) -> AppResult<ApiResponse<TokenPair>> {
    request
        .validate()
        .map_err(|e| AppError::Validation(format_validation_errors(&e)))?;

    let tokens = state
        .jwt_service
        .refresh_access_token(&request.refresh_token)
        .await?;
    Ok(respond(tokens))
}

/// End the session behind a refresh token
pub async fn logout(
    State(state): State<AppState>,
    Json(request): Json<RefreshTokenRequest>,
) -> AppResult<StatusCode> {
    request
        .validate()
        .map_err(|e| AppError::Validation(format_validation_errors(&e)))?;

    state
        .jwt_service
        .revoke_refresh_token(&request.refresh_token)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// The caller's account, organization memberships and administered teams
pub async fn me(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<ApiResponse<MeResponse>> {
    let me = state.user_service.me(auth_user.0.user_id).await?;
    Ok(respond(me))
}
