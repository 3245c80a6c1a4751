use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::RequireAuth;
use crate::server::AppState;
use crate::server::dto::{
    CreateUserRequest, ListQuery, PasswordRequest, UpdateUserRequest, UserRolesRequest,
};
use crate::server::response::{ApiResponse, ApiResult, PageResponse};
use crate::service::NewUserRequest;
use crate::types::{Action, AdminSection, SubjectPermissions};

pub async fn create_user(
    RequireAuth(auth): RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> ApiResult<impl IntoResponse> {
    auth.require_admin(AdminSection::Users, Action::Write)?;
    let new_user = NewUserRequest {
        username: req.username,
        password: req.password,
        active: req.active,
        firstname: req.firstname,
        lastname: req.lastname,
    };
    let user = state.run(move |s, ctx| s.users.create(ctx, &new_user)).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(user))))
}

pub async fn list_users(
    RequireAuth(auth): RequireAuth,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> ApiResult<impl IntoResponse> {
    auth.require_admin(AdminSection::Users, Action::Read)?;
    let page = state.run(move |s, ctx| s.users.list(ctx, &query.into_params())).await?;
    Ok(Json(PageResponse::from(page)))
}

pub async fn get_user(
    RequireAuth(auth): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    auth.require_admin(AdminSection::Users, Action::Read)?;
    let user = state.run(move |s, ctx| s.users.get(ctx, id)).await?;
    Ok(Json(ApiResponse::success(user)))
}

pub async fn update_user(
    RequireAuth(auth): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateUserRequest>,
) -> ApiResult<impl IntoResponse> {
    auth.require_admin(AdminSection::Users, Action::Write)?;
    let user = state
        .run(move |s, ctx| s.users.update_profile(ctx, id, &req.firstname, &req.lastname, req.active))
        .await?;
    Ok(Json(ApiResponse::success(user)))
}

pub async fn delete_user(
    RequireAuth(auth): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    auth.require_admin(AdminSection::Users, Action::Write)?;
    state.run(move |s, ctx| s.users.delete(ctx, id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_password(
    RequireAuth(auth): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<PasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    // Users may always change their own password.
    if auth.user_id != id {
        auth.require_admin(AdminSection::Users, Action::Write)?;
    }
    state.run(move |s, ctx| s.users.set_password(ctx, id, req.password.as_deref())).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_user_roles(
    RequireAuth(auth): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    auth.require_admin(AdminSection::Users, Action::Read)?;
    let roles = state.run(move |s, ctx| s.users.roles(ctx, id)).await?;
    Ok(Json(ApiResponse::success(roles)))
}

pub async fn update_user_roles(
    RequireAuth(auth): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<UserRolesRequest>,
) -> ApiResult<impl IntoResponse> {
    auth.require_admin(AdminSection::Users, Action::Write)?;
    let roles = state.run(move |s, ctx| s.users.update_roles(ctx, id, &req.roles)).await?;
    Ok(Json(ApiResponse::success(roles)))
}

pub async fn get_user_permissions(
    RequireAuth(auth): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    auth.require_admin(AdminSection::Users, Action::Read)?;
    let permissions = state.run(move |s, ctx| s.users.permissions(ctx, id)).await?;
    Ok(Json(ApiResponse::success(permissions)))
}

pub async fn update_user_permissions(
    RequireAuth(auth): RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<SubjectPermissions>,
) -> ApiResult<impl IntoResponse> {
    auth.require_admin(AdminSection::Users, Action::Write)?;
    let permissions = state.run(move |s, ctx| s.users.update_permissions(ctx, id, &req)).await?;
    Ok(Json(ApiResponse::success(permissions)))
}
