//! Endpoints polled by edge agents.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
};

use crate::auth::RequireAuth;
use crate::server::AppState;
use crate::server::dto::PublishedView;
use crate::server::response::{ApiResponse, ApiResult};
use crate::service::agents::AgentHit;
use crate::types::{Action, ResourceKind};

pub fn agent_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/published", get(published))
        .route("/hit", post(hit))
}

async fn published(
    RequireAuth(auth): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path((ns, project)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    auth.require_resource(&ns, &project, ResourceKind::Agent, Action::Read)?;
    let view = state
        .run(move |s, ctx| {
            let info = s.projects.get(ctx, &ns, &project)?;
            Ok(PublishedView {
                version: info.version,
                published_at: info.published_at,
                redirects: s.redirects.published(ctx, &ns, &project)?,
                pages: s.pages.published(ctx, &ns, &project)?,
            })
        })
        .await?;
    Ok(Json(ApiResponse::success(view)))
}

async fn hit(
    RequireAuth(auth): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path((ns, project)): Path<(String, String)>,
    Json(hit): Json<AgentHit>,
) -> ApiResult<impl IntoResponse> {
    auth.require_resource(&ns, &project, ResourceKind::Agent, Action::Write)?;
    let agent = state.run(move |s, ctx| s.agents.upsert(ctx, &ns, &project, hit)).await?;
    Ok(Json(ApiResponse::success(agent)))
}
