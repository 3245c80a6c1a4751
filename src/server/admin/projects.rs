use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::{AuthContext, RequireAuth};
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::{CodeNameRequest, ListQuery, RenameRequest};
use crate::server::response::{ApiResponse, ApiResult, PageResponse};
use crate::types::{Action, AdminSection, ResourceKind, ResourcePermission};

fn visibility(auth: &AuthContext) -> Option<Vec<ResourcePermission>> {
    if auth.can_admin(AdminSection::Projects, Action::Read) {
        None
    } else {
        Some(auth.rules_for(ResourceKind::Any, Action::Read))
    }
}

pub async fn list_all_projects(
    RequireAuth(auth): RequireAuth,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> ApiResult<impl IntoResponse> {
    let rules = visibility(&auth);
    let page = state
        .run(move |s, ctx| s.projects.list(ctx, None, rules.as_deref(), &query.into_params()))
        .await?;
    Ok(Json(PageResponse::from(page)))
}

pub async fn list_projects(
    RequireAuth(auth): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(ns): Path<String>,
    Query(query): Query<ListQuery>,
) -> ApiResult<impl IntoResponse> {
    let rules = visibility(&auth);
    let page = state
        .run(move |s, ctx| s.projects.list(ctx, Some(&ns), rules.as_deref(), &query.into_params()))
        .await?;
    Ok(Json(PageResponse::from(page)))
}

pub async fn create_project(
    RequireAuth(auth): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(ns): Path<String>,
    Json(req): Json<CodeNameRequest>,
) -> ApiResult<impl IntoResponse> {
    auth.require_admin(AdminSection::Projects, Action::Write)?;
    let project = state.run(move |s, ctx| s.projects.create(ctx, &ns, &req.code, &req.name)).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(project))))
}

pub async fn get_project(
    RequireAuth(auth): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path((ns, code)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    if visibility(&auth).is_some() && !auth.can_resource(&ns, &code, ResourceKind::Any, Action::Read) {
        return Err(Error::Forbidden.into());
    }
    let project = state.run(move |s, ctx| s.projects.get(ctx, &ns, &code)).await?;
    Ok(Json(ApiResponse::success(project)))
}

pub async fn rename_project(
    RequireAuth(auth): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path((ns, code)): Path<(String, String)>,
    Json(req): Json<RenameRequest>,
) -> ApiResult<impl IntoResponse> {
    auth.require_admin(AdminSection::Projects, Action::Write)?;
    let project = state.run(move |s, ctx| s.projects.rename(ctx, &ns, &code, &req.name)).await?;
    Ok(Json(ApiResponse::success(project)))
}

pub async fn delete_project(
    RequireAuth(auth): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path((ns, code)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    auth.require_admin(AdminSection::Projects, Action::Write)?;
    state.run(move |s, ctx| s.projects.delete(ctx, &ns, &code)).await?;
    Ok(StatusCode::NO_CONTENT)
}
