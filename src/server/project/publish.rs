use std::sync::Arc;

use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    response::IntoResponse,
};

use crate::auth::{AuthContext, RequireAuth};
use crate::error::Result;
use crate::server::AppState;
use crate::server::dto::ImportQuery;
use crate::server::response::{ApiError, ApiResponse, ApiResult};
use crate::service::import;
use crate::types::{Action, ResourceKind};

/// Publish and rollback touch both redirects and pages.
fn require_project_write(auth: &AuthContext, ns: &str, project: &str) -> Result<()> {
    auth.require_resource(ns, project, ResourceKind::Redirect, Action::Write)?;
    auth.require_resource(ns, project, ResourceKind::Page, Action::Write)
}

pub async fn publish(
    RequireAuth(auth): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path((ns, project)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    require_project_write(&auth, &ns, &project)?;
    let outcome = state.run(move |s, ctx| s.publish.publish(ctx, &ns, &project)).await?;
    Ok(Json(ApiResponse::success(outcome)))
}

pub async fn rollback(
    RequireAuth(auth): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path((ns, project)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    require_project_write(&auth, &ns, &project)?;
    let outcome = state.run(move |s, ctx| s.publish.rollback(ctx, &ns, &project)).await?;
    Ok(Json(ApiResponse::success(outcome)))
}

pub async fn dashboard(
    RequireAuth(auth): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path((ns, project)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    auth.require_resource(&ns, &project, ResourceKind::Any, Action::Read)?;
    let dashboard = state.run(move |s, ctx| s.dashboard.get(ctx, &ns, &project)).await?;
    Ok(Json(ApiResponse::success(dashboard)))
}

/// POST /redirects/import?overwrite=bool, multipart field `file`.
pub async fn import_redirects(
    RequireAuth(auth): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path((ns, project)): Path<(String, String)>,
    Query(query): Query<ImportQuery>,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    auth.require_resource(&ns, &project, ResourceKind::Redirect, Action::Write)?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Failed to read multipart: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read file: {e}")))?;
        upload = Some((file_name, content_type, data));
    }
    let (file_name, content_type, data) =
        upload.ok_or_else(|| ApiError::bad_request("File field is required"))?;

    import::check_upload(&file_name, content_type.as_deref(), data.len())?;
    let report = state
        .run(move |s, ctx| s.imports.import_bytes(ctx, &ns, &project, &data, query.overwrite))
        .await?;
    Ok(Json(ApiResponse::success(report)))
}
