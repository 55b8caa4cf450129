//! Reset hook trait.

use async_trait::async_trait;
use pc_error::Result;
use std::future::Future;

/// Callback run by a cursor after it has reinitialized its own position.
#[async_trait]
pub trait ResetHook: Send + Sync {
    /// Called once per `reset()`.
    async fn on_reset(&self) -> Result<()>;
}

/// Reset hook that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopResetHook;

#[async_trait]
impl ResetHook for NoopResetHook {
    async fn on_reset(&self) -> Result<()> {
        Ok(())
    }
}

/// Adapts an async closure into a [`ResetHook`].
pub struct FnResetHook<F> {
    f: F,
}

impl<F> FnResetHook<F> {
    /// Wrap a closure.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> ResetHook for FnResetHook<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send,
{
    async fn on_reset(&self) -> Result<()> {
        (self.f)().await
    }
}
