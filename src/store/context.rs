use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

/// Per-request context handed to every store entry point.
#[derive(Debug, Clone, Default)]
pub struct Ctx {
    cancel: CancellationToken,
}

impl Ctx {
    /// A context that is never cancelled unless `cancel` is called on it.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fails with [`Error::Cancelled`] once the context is cancelled.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_after_cancel() {
        let ctx = Ctx::new();
        assert!(ctx.check().is_ok());
        ctx.clone().cancel();
        assert!(matches!(ctx.check(), Err(Error::Cancelled)));
    }

    #[test]
    fn test_child_token_propagates() {
        let parent = CancellationToken::new();
        let ctx = Ctx::with_cancellation(parent.child_token());
        parent.cancel();
        assert!(ctx.is_cancelled());
    }
}
