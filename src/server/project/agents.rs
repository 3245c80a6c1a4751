use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::RequireAuth;
use crate::server::AppState;
use crate::server::dto::ListQuery;
use crate::server::response::{ApiResponse, ApiResult, PageResponse};
use crate::types::{Action, ResourceKind};

pub async fn list_agents(
    RequireAuth(auth): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path((ns, project)): Path<(String, String)>,
    Query(query): Query<ListQuery>,
) -> ApiResult<impl IntoResponse> {
    auth.require_resource(&ns, &project, ResourceKind::Agent, Action::Read)?;
    let page = state
        .run(move |s, ctx| s.agents.list(ctx, &ns, &project, &query.into_params()))
        .await?;
    Ok(Json(PageResponse::from(page)))
}

pub async fn get_agent(
    RequireAuth(auth): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path((ns, project, id)): Path<(String, String, i64)>,
) -> ApiResult<impl IntoResponse> {
    auth.require_resource(&ns, &project, ResourceKind::Agent, Action::Read)?;
    let agent = state.run(move |s, ctx| s.agents.get(ctx, &ns, &project, id)).await?;
    Ok(Json(ApiResponse::success(agent)))
}

pub async fn delete_agent(
    RequireAuth(auth): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path((ns, project, id)): Path<(String, String, i64)>,
) -> ApiResult<impl IntoResponse> {
    auth.require_resource(&ns, &project, ResourceKind::Agent, Action::Write)?;
    state.run(move |s, ctx| s.agents.delete(ctx, &ns, &project, id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
