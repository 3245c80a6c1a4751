use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use crate::auth::{AuthType, RequireAuth};
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::{LoginRequest, MeResponse, RefreshRequest, SessionResponse};
use crate::server::response::{ApiError, ApiResponse, ApiResult};

pub fn session_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let (user, tokens) = state
        .run(move |s, ctx| s.auth.login(ctx, &req.username, &req.password))
        .await
        .map_err(|e| match e {
            // Inactive and password-less users look like bad credentials.
            Error::UserNotFound => ApiError::unauthorized(Error::InvalidCredentials.to_string()),
            e => ApiError::from(e),
        })?;
    Ok(Json(ApiResponse::success(SessionResponse { user, tokens })))
}

async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<impl IntoResponse> {
    let (user, tokens) = state
        .run(move |s, ctx| s.auth.refresh(ctx, &req.refresh_token))
        .await
        .map_err(|e| match e {
            Error::UserNotFound => ApiError::unauthorized(Error::InvalidToken.to_string()),
            e => ApiError::from(e),
        })?;
    Ok(Json(ApiResponse::success(SessionResponse { user, tokens })))
}

async fn logout(
    RequireAuth(auth): RequireAuth,
    State(state): State<Arc<AppState>>,
) -> ApiResult<impl IntoResponse> {
    if auth.auth_type != AuthType::Basic {
        return Err(ApiError::bad_request("API tokens have no session to end"));
    }
    state.run(move |s, ctx| s.auth.logout(ctx, auth.user_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn me(
    RequireAuth(auth): RequireAuth,
    State(state): State<Arc<AppState>>,
) -> ApiResult<impl IntoResponse> {
    if auth.auth_type != AuthType::Basic {
        return Ok(Json(ApiResponse::success(auth)).into_response());
    }
    let (user, permissions) = state.run(move |s, ctx| s.auth.me(ctx, auth.user_id)).await?;
    Ok(Json(ApiResponse::success(MeResponse { user, permissions })).into_response())
}
