//! The fetch seam: how values enter the cache.
//!
//! The cache never performs I/O itself. Callers supply a [`Fetch`]
//! implementation — typically an async closure over their network layer —
//! and the cache decides when to invoke it. The cache is
//! fetch-cancellation-agnostic: if a caller needs to abort an in-flight
//! fetch it must do so inside its own fetcher.

use std::future::Future;

use async_trait::async_trait;
use cadence_core::FetchError;

/// An asynchronous source for one cache key's value.
///
/// Implementations must be `Send + Sync`: a fetcher handed to
/// [`RequestCache::get`](crate::RequestCache::get) may be driven from a
/// background revalidation task.
#[async_trait]
pub trait Fetch<V>: Send + Sync {
    /// Produce the value. Failures are reported as [`FetchError`]; the
    /// cache decides whether to degrade to a stale value or propagate.
    async fn fetch(&self) -> Result<V, FetchError>;
}

/// Any async closure returning `Result<V, FetchError>` is a fetcher.
#[async_trait]
impl<V, F, Fut> Fetch<V> for F
where
    V: Send + 'static,
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<V, FetchError>> + Send + 'static,
{
    async fn fetch(&self) -> Result<V, FetchError> {
        (self)().await
    }
}
