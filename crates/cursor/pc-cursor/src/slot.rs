//! Per-index result holders.

use pc_error::{CursorError, FetchError};
use std::sync::Arc;
use tokio::sync::watch;

/// Settled outcome of fetching one index.
///
/// A failed fetch does not stop the cursor; the consumer receives
/// [`Fetched::Failed`] at that position and iteration continues.
#[derive(Debug, Clone)]
pub enum Fetched<T> {
    /// The fetcher returned a value.
    Ready(T),

    /// The fetcher failed for this index.
    Failed(Arc<FetchError>),
}

impl<T> Fetched<T> {
    /// Check if the fetch succeeded.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Check if the fetch failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Borrow the value, if any.
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Failed(_) => None,
        }
    }

    /// Borrow the error, if any.
    pub fn error(&self) -> Option<&FetchError> {
        match self {
            Self::Ready(_) => None,
            Self::Failed(err) => Some(err),
        }
    }

    /// Take the value, discarding the error.
    pub fn ok(self) -> Option<T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Failed(_) => None,
        }
    }

    /// Convert into a standard `Result`.
    pub fn into_result(self) -> Result<T, Arc<FetchError>> {
        match self {
            Self::Ready(value) => Ok(value),
            Self::Failed(err) => Err(err),
        }
    }

    pub(crate) fn failed(index: u64, error: CursorError) -> Self {
        let error = match error {
            CursorError::Fetch(e) => e,
            other => FetchError::Source(other.to_string()),
        };
        tracing::trace!(index, error = %error, "Recording failed fetch");
        Self::Failed(Arc::new(error))
    }
}

/// Buffer entry for one admitted index.
///
/// The receiver holds `None` until the fetch settles. The launch id ties the
/// entry to the fetch task that created it so that a task outliving a purge
/// cannot touch a newer slot for the same index.
#[derive(Debug)]
pub(crate) struct Slot<T> {
    pub(crate) launch_id: u64,
    pub(crate) rx: watch::Receiver<Option<Fetched<T>>>,
}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        Self {
            launch_id: self.launch_id,
            rx: self.rx.clone(),
        }
    }
}

impl<T: Clone> Slot<T> {
    /// Check if the fetch has settled.
    pub(crate) fn is_settled(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// Wait until the fetch settles and return its outcome.
    pub(crate) async fn settled(mut self, index: u64) -> Fetched<T> {
        let abandoned = || Fetched::Failed(Arc::new(FetchError::Abandoned(index)));
        match self.rx.wait_for(Option::is_some).await {
            Ok(value) => (*value).clone().unwrap_or_else(abandoned),
            Err(_) => abandoned(),
        }
    }
}
