//! Offloads rusqlite-backed service calls from the async executor.

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::AppState;
use crate::error::{Error, Result};
use crate::service::Services;
use crate::store::Ctx;

impl AppState {
    /// Runs `f` on the blocking pool with a request-scoped [`Ctx`].
    ///
    /// Dropping the returned future cancels the `Ctx`, so a client that
    /// disconnects stops the call at its next storage entry point or
    /// publish batch.
    pub fn run<T, F>(self: &Arc<Self>, f: F) -> impl Future<Output = Result<T>> + Send + 'static
    where
        F: FnOnce(&Services, &Ctx) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let state = Arc::clone(self);
        let token = CancellationToken::new();
        let ctx = Ctx::with_cancellation(token.clone());
        async move {
            let _cancel_on_drop = token.drop_guard();
            tokio::task::spawn_blocking(move || f(&state.services, &ctx))
                .await
                .map_err(|e| Error::Internal(format!("service task failed: {e}")))?
        }
    }
}
