//! Published rows and drafts, shared by redirects and pages.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::auth::RequireAuth;
use crate::server::AppState;
use crate::server::dto::{CreateDraftRequest, ListQuery, UpdateDraftRequest};
use crate::server::response::{ApiResponse, ApiResult, PageResponse};
use crate::service::{DraftEngine, Draftable, Services};
use crate::types::{Action, PageData, RedirectData, ResourceKind};

/// A payload exposed over HTTP, tied to its engine and permission resource.
pub trait ContentRoute: Draftable + Serialize + DeserializeOwned + Send + Sync + 'static {
    const RESOURCE: ResourceKind;

    fn engine(services: &Services) -> &DraftEngine<Self>;
}

impl ContentRoute for RedirectData {
    const RESOURCE: ResourceKind = ResourceKind::Redirect;

    fn engine(services: &Services) -> &DraftEngine<Self> {
        &services.redirects
    }
}

impl ContentRoute for PageData {
    const RESOURCE: ResourceKind = ResourceKind::Page;

    fn engine(services: &Services) -> &DraftEngine<Self> {
        &services.pages
    }
}

pub async fn list_published<P: ContentRoute>(
    RequireAuth(auth): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path((ns, project)): Path<(String, String)>,
    Query(query): Query<ListQuery>,
) -> ApiResult<impl IntoResponse> {
    auth.require_resource(&ns, &project, P::RESOURCE, Action::Read)?;
    let page = state
        .run(move |s, ctx| P::engine(s).list(ctx, &ns, &project, &query.into_params()))
        .await?;
    Ok(Json(PageResponse::from(page)))
}

pub async fn get_published<P: ContentRoute>(
    RequireAuth(auth): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path((ns, project, id)): Path<(String, String, i64)>,
) -> ApiResult<impl IntoResponse> {
    auth.require_resource(&ns, &project, P::RESOURCE, Action::Read)?;
    let record = state.run(move |s, ctx| P::engine(s).get(ctx, &ns, &project, id)).await?;
    Ok(Json(ApiResponse::success(record)))
}

pub async fn list_drafts<P: ContentRoute>(
    RequireAuth(auth): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path((ns, project)): Path<(String, String)>,
    Query(query): Query<ListQuery>,
) -> ApiResult<impl IntoResponse> {
    auth.require_resource(&ns, &project, P::RESOURCE, Action::Read)?;
    let page = state
        .run(move |s, ctx| P::engine(s).list_drafts(ctx, &ns, &project, &query.into_params()))
        .await?;
    Ok(Json(PageResponse::from(page)))
}

pub async fn get_draft<P: ContentRoute>(
    RequireAuth(auth): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path((ns, project, id)): Path<(String, String, i64)>,
) -> ApiResult<impl IntoResponse> {
    auth.require_resource(&ns, &project, P::RESOURCE, Action::Read)?;
    let draft = state.run(move |s, ctx| P::engine(s).get_draft(ctx, &ns, &project, id)).await?;
    Ok(Json(ApiResponse::success(draft)))
}

pub async fn create_draft<P: ContentRoute>(
    RequireAuth(auth): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path((ns, project)): Path<(String, String)>,
    Json(req): Json<CreateDraftRequest<P>>,
) -> ApiResult<impl IntoResponse> {
    auth.require_resource(&ns, &project, P::RESOURCE, Action::Write)?;
    let draft = state
        .run(move |s, ctx| P::engine(s).create(ctx, &ns, &project, req.old_id, req.new))
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(draft))))
}

pub async fn update_draft<P: ContentRoute>(
    RequireAuth(auth): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path((ns, project, id)): Path<(String, String, i64)>,
    Json(req): Json<UpdateDraftRequest<P>>,
) -> ApiResult<impl IntoResponse> {
    auth.require_resource(&ns, &project, P::RESOURCE, Action::Write)?;
    let draft = state
        .run(move |s, ctx| P::engine(s).update(ctx, &ns, &project, id, req.new))
        .await?;
    Ok(Json(ApiResponse::success(draft)))
}

pub async fn delete_draft<P: ContentRoute>(
    RequireAuth(auth): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path((ns, project, id)): Path<(String, String, i64)>,
) -> ApiResult<impl IntoResponse> {
    auth.require_resource(&ns, &project, P::RESOURCE, Action::Write)?;
    state.run(move |s, ctx| P::engine(s).delete(ctx, &ns, &project, id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
