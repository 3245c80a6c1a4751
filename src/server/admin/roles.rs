use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::RequireAuth;
use crate::server::AppState;
use crate::server::dto::{CreateRoleRequest, ListQuery};
use crate::server::response::{ApiResponse, ApiResult, PageResponse};
use crate::types::{Action, AdminSection, SubjectPermissions};

pub async fn create_role(
    RequireAuth(auth): RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateRoleRequest>,
) -> ApiResult<impl IntoResponse> {
    auth.require_admin(AdminSection::Roles, Action::Write)?;
    let role = state.run(move |s, ctx| s.roles.create(ctx, &req.code, &req.permissions)).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(role))))
}

pub async fn list_roles(
    RequireAuth(auth): RequireAuth,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> ApiResult<impl IntoResponse> {
    auth.require_admin(AdminSection::Roles, Action::Read)?;
    let page = state.run(move |s, ctx| s.roles.list(ctx, &query.into_params())).await?;
    Ok(Json(PageResponse::from(page)))
}

pub async fn get_role(
    RequireAuth(auth): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> ApiResult<impl IntoResponse> {
    auth.require_admin(AdminSection::Roles, Action::Read)?;
    let role = state.run(move |s, ctx| s.roles.get(ctx, &code)).await?;
    Ok(Json(ApiResponse::success(role)))
}

pub async fn delete_role(
    RequireAuth(auth): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> ApiResult<impl IntoResponse> {
    auth.require_admin(AdminSection::Roles, Action::Write)?;
    state.run(move |s, ctx| s.roles.delete(ctx, &code)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_role_permissions(
    RequireAuth(auth): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> ApiResult<impl IntoResponse> {
    auth.require_admin(AdminSection::Roles, Action::Read)?;
    let permissions = state.run(move |s, ctx| s.roles.permissions(ctx, &code)).await?;
    Ok(Json(ApiResponse::success(permissions)))
}

pub async fn update_role_permissions(
    RequireAuth(auth): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Json(req): Json<SubjectPermissions>,
) -> ApiResult<impl IntoResponse> {
    auth.require_admin(AdminSection::Roles, Action::Write)?;
    let permissions = state.run(move |s, ctx| s.roles.update_permissions(ctx, &code, &req)).await?;
    Ok(Json(ApiResponse::success(permissions)))
}
