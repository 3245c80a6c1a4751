mod agents;
mod content;
mod publish;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use crate::server::AppState;
use crate::service::import::MAX_IMPORT_SIZE;
use crate::types::{PageData, RedirectData};

/// Headroom for the multipart framing around the uploaded file.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Routes scoped to `/namespaces/{ns}/projects/{project}`.
pub fn project_router() -> Router<Arc<AppState>> {
    Router::new()
        // Published rows
        .route("/redirects", get(content::list_published::<RedirectData>))
        .route("/redirects/{id}", get(content::get_published::<RedirectData>))
        .route("/pages", get(content::list_published::<PageData>))
        .route("/pages/{id}", get(content::get_published::<PageData>))
        // Drafts
        .route(
            "/redirect-drafts",
            get(content::list_drafts::<RedirectData>).post(content::create_draft::<RedirectData>),
        )
        .route(
            "/redirect-drafts/{id}",
            get(content::get_draft::<RedirectData>)
                .put(content::update_draft::<RedirectData>)
                .delete(content::delete_draft::<RedirectData>),
        )
        .route(
            "/page-drafts",
            get(content::list_drafts::<PageData>).post(content::create_draft::<PageData>),
        )
        .route(
            "/page-drafts/{id}",
            get(content::get_draft::<PageData>)
                .put(content::update_draft::<PageData>)
                .delete(content::delete_draft::<PageData>),
        )
        .route(
            "/redirects/import",
            post(publish::import_redirects)
                .layer(DefaultBodyLimit::max(MAX_IMPORT_SIZE + MULTIPART_OVERHEAD)),
        )
        // Project-wide operations
        .route("/publish", post(publish::publish))
        .route("/rollback", post(publish::rollback))
        .route("/dashboard", get(publish::dashboard))
        // Agents
        .route("/agents", get(agents::list_agents))
        .route(
            "/agents/{id}",
            get(agents::get_agent).delete(agents::delete_agent),
        )
}
