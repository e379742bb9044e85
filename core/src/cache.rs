//! Cache capability consulted around the transport call.
//!
//! The cache is externally owned, shared, mutable state keyed by endpoint
//! string only — not method, body, or headers. That is a deliberate,
//! documented limitation: two calls to the same endpoint with different
//! bodies share a cache slot.
//!
//! # Contract with the pipeline
//!
//! - `get` is only ever called after a `has` on the same key returned `true`
//! - `set` is only ever called with the payload of an emitted success event
//!   from a live (non-cached) transport call
//! - `set` failures are logged and swallowed; `has`/`get` failures abort the
//!   call with a `RequestError` event and never fall through to the network
//! - the pipeline performs no locking and assumes no exclusivity; concurrent
//!   external mutation between `has` and `get` must be tolerated by
//!   implementations (a failing `get` after a truthful `has` is reported,
//!   not retried)
//!
//! # Dyn Compatibility
//!
//! Methods return `Pin<Box<dyn Future>>` instead of using `async fn` so the
//! trait can live behind `Arc<dyn Cache>` on a call description.

use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors from cache operations.
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// `has` failed.
    #[error("cache probe failed for key '{key}': {reason}")]
    Probe {
        /// The endpoint key being probed.
        key: String,
        /// Why the probe failed.
        reason: String,
    },

    /// `get` failed after a truthful `has`.
    #[error("cache read failed for key '{key}': {reason}")]
    Read {
        /// The endpoint key being read.
        key: String,
        /// Why the read failed.
        reason: String,
    },

    /// `set` failed. The pipeline logs and swallows this.
    #[error("cache write failed for key '{key}': {reason}")]
    Write {
        /// The endpoint key being written.
        key: String,
        /// Why the write failed.
        reason: String,
    },
}

/// Future type returned by cache operations.
pub type CacheFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, CacheError>> + Send + 'a>>;

/// A key-value store keyed by endpoint string.
///
/// Implementations must be `Send + Sync`; the pipeline shares them across
/// concurrently processed envelopes without coordination.
///
/// # Examples
///
/// ```rust,ignore
/// let cache: Arc<dyn Cache> = Arc::new(RedisCache::connect(url).await?);
/// let call = ApiCall::new("/users", Method::Get, types).with_cache(cache);
/// ```
pub trait Cache: Send + Sync {
    /// Whether a value exists for this key.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Probe`] when the store cannot answer. The
    /// pipeline treats this as fatal for the call — it does NOT fall through
    /// to a live request.
    fn has(&self, key: &str) -> CacheFuture<'_, bool>;

    /// Read the value for this key.
    ///
    /// Only called after [`has`](Cache::has) returned `true` for the same
    /// key, but the value may have been evicted in between.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Read`] when the value cannot be produced.
    fn get(&self, key: &str) -> CacheFuture<'_, Value>;

    /// Store a value for this key. Fire-and-forget from the pipeline's
    /// perspective.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Write`]; the pipeline logs and ignores it.
    fn set(&self, key: &str, value: &Value) -> CacheFuture<'_, ()>;
}
