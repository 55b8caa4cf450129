//! Index fetcher trait and stock implementations.

use async_trait::async_trait;
use pc_error::Result;
use std::future::Future;
use std::marker::PhantomData;

/// Trait for index-addressed data sources.
///
/// Implementations may take arbitrarily long and may fail. The cursor calls
/// [`fetch`](IndexFetcher::fetch) at most once per admitted index and never
/// retries a failure.
#[async_trait]
pub trait IndexFetcher<T>: Send + Sync {
    /// Fetches the item at `index`.
    ///
    /// # Arguments
    ///
    /// * `index` - Zero-based position in the sequence
    ///
    /// # Returns
    ///
    /// The item, or an error which the cursor turns into a failed slot
    async fn fetch(&self, index: u64) -> Result<T>;
}

/// Fetcher that returns the index itself.
///
/// This is the source a cursor uses until a real one is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityFetcher;

#[async_trait]
impl<T> IndexFetcher<T> for IdentityFetcher
where
    T: From<u64> + Send + 'static,
{
    async fn fetch(&self, index: u64) -> Result<T> {
        Ok(T::from(index))
    }
}

/// Adapts an async closure into an [`IndexFetcher`].
///
/// ```ignore
/// let fetcher = FnFetcher::new(|index| async move { Ok::<_, CursorError>(index * 2) });
/// ```
pub struct FnFetcher<F, T> {
    f: F,
    _marker: PhantomData<fn() -> T>,
}

impl<F, T> FnFetcher<F, T> {
    /// Wrap a closure.
    pub fn new(f: F) -> Self {
        Self {
            f,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<F, Fut, T> IndexFetcher<T> for FnFetcher<F, T>
where
    F: Fn(u64) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T>> + Send,
    T: Send + 'static,
{
    async fn fetch(&self, index: u64) -> Result<T> {
        (self.f)(index).await
    }
}
