use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::RequireAuth;
use crate::server::AppState;
use crate::server::dto::{CreateTokenRequest, ListQuery};
use crate::server::response::{ApiResponse, ApiResult, PageResponse};
use crate::types::{Action, AdminSection};

/// The response is the only place the plain token ever appears.
pub async fn create_token(
    RequireAuth(auth): RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTokenRequest>,
) -> ApiResult<impl IntoResponse> {
    auth.require_admin(AdminSection::Tokens, Action::Write)?;
    let created = state
        .run(move |s, ctx| s.tokens.create(ctx, &req.name, req.expires_at, &req.permissions))
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

pub async fn list_tokens(
    RequireAuth(auth): RequireAuth,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> ApiResult<impl IntoResponse> {
    auth.require_admin(AdminSection::Tokens, Action::Read)?;
    let page = state.run(move |s, ctx| s.tokens.list(ctx, &query.into_params())).await?;
    Ok(Json(PageResponse::from(page)))
}

pub async fn get_token(
    RequireAuth(auth): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    auth.require_admin(AdminSection::Tokens, Action::Read)?;
    let token = state.run(move |s, ctx| s.tokens.get(ctx, id)).await?;
    Ok(Json(ApiResponse::success(token)))
}

pub async fn get_token_permissions(
    RequireAuth(auth): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    auth.require_admin(AdminSection::Tokens, Action::Read)?;
    let permissions = state.run(move |s, ctx| s.tokens.permissions(ctx, id)).await?;
    Ok(Json(ApiResponse::success(permissions)))
}

pub async fn delete_token(
    RequireAuth(auth): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    auth.require_admin(AdminSection::Tokens, Action::Write)?;
    state.run(move |s, ctx| s.tokens.delete(ctx, id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
