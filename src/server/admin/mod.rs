mod namespaces;
mod projects;
mod roles;
mod tokens;
mod users;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, put},
};

use crate::server::AppState;

pub fn admin_router() -> Router<Arc<AppState>> {
    Router::new()
        // Namespace routes
        .route(
            "/namespaces",
            get(namespaces::list_namespaces).post(namespaces::create_namespace),
        )
        .route(
            "/namespaces/{ns}",
            get(namespaces::get_namespace)
                .put(namespaces::update_namespace)
                .delete(namespaces::delete_namespace),
        )
        // Project routes
        .route("/projects", get(projects::list_all_projects))
        .route(
            "/namespaces/{ns}/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route(
            "/namespaces/{ns}/projects/{project}",
            get(projects::get_project)
                .put(projects::rename_project)
                .delete(projects::delete_project),
        )
        // Role routes
        .route("/roles", get(roles::list_roles).post(roles::create_role))
        .route("/roles/{code}", get(roles::get_role).delete(roles::delete_role))
        .route(
            "/roles/{code}/permissions",
            get(roles::get_role_permissions).put(roles::update_role_permissions),
        )
        // User routes
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/users/{id}/password", put(users::set_password))
        .route(
            "/users/{id}/roles",
            get(users::get_user_roles).put(users::update_user_roles),
        )
        .route(
            "/users/{id}/permissions",
            get(users::get_user_permissions).put(users::update_user_permissions),
        )
        // Token routes
        .route("/tokens", get(tokens::list_tokens).post(tokens::create_token))
        .route("/tokens/{id}", get(tokens::get_token).delete(tokens::delete_token))
        .route("/tokens/{id}/permissions", get(tokens::get_token_permissions))
}
