use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{Router, routing::get};

use super::admin::admin_router;
use super::agent::agent_router;
use super::project::project_router;
use super::session::session_router;
use crate::config::Config;
use crate::error::Result;
use crate::service::Services;
use crate::store::SqliteStore;

pub struct AppState {
    pub services: Services,
    pub config: Config,
}

impl AppState {
    pub fn new(store: Arc<SqliteStore>, config: Config) -> Result<Self> {
        Ok(Self {
            services: Services::new(store, &config)?,
            config,
        })
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1/auth", session_router())
        .nest("/api/v1/admin", admin_router())
        .nest("/api/v1/namespaces/{ns}/projects/{project}", project_router())
        .nest("/api/v1/agent/namespaces/{ns}/projects/{project}", agent_router())
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
