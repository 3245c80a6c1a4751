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

/// `None` when the subject administers namespaces, otherwise the rules that
/// decide which namespaces it can see.
fn visibility(auth: &AuthContext) -> Option<Vec<ResourcePermission>> {
    if auth.can_admin(AdminSection::Namespaces, Action::Read) {
        None
    } else {
        Some(auth.rules_for(ResourceKind::Any, Action::Read))
    }
}

pub async fn create_namespace(
    RequireAuth(auth): RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CodeNameRequest>,
) -> ApiResult<impl IntoResponse> {
    auth.require_admin(AdminSection::Namespaces, Action::Write)?;
    let ns = state.run(move |s, ctx| s.namespaces.create(ctx, &req.code, &req.name)).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(ns))))
}

pub async fn list_namespaces(
    RequireAuth(auth): RequireAuth,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> ApiResult<impl IntoResponse> {
    let rules = visibility(&auth);
    let page = state
        .run(move |s, ctx| s.namespaces.list(ctx, rules.as_deref(), &query.into_params()))
        .await?;
    Ok(Json(PageResponse::from(page)))
}

pub async fn get_namespace(
    RequireAuth(auth): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> ApiResult<impl IntoResponse> {
    if let Some(rules) = visibility(&auth) {
        if !rules.iter().any(|rule| rule.namespace.matches_str(&code)) {
            return Err(Error::Forbidden.into());
        }
    }
    let ns = state.run(move |s, ctx| s.namespaces.get(ctx, &code)).await?;
    Ok(Json(ApiResponse::success(ns)))
}

pub async fn update_namespace(
    RequireAuth(auth): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Json(req): Json<RenameRequest>,
) -> ApiResult<impl IntoResponse> {
    auth.require_admin(AdminSection::Namespaces, Action::Write)?;
    let ns = state.run(move |s, ctx| s.namespaces.update(ctx, &code, &req.name)).await?;
    Ok(Json(ApiResponse::success(ns)))
}

pub async fn delete_namespace(
    RequireAuth(auth): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> ApiResult<impl IntoResponse> {
    auth.require_admin(AdminSection::Namespaces, Action::Write)?;
    state.run(move |s, ctx| s.namespaces.delete(ctx, &code)).await?;
    Ok(StatusCode::NO_CONTENT)
}
