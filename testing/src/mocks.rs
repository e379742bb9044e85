//! Mock implementations of the pipeline's collaborator traits.
//!
//! Every mock records what was asked of it, so tests assert not only on
//! emitted events but on the exact sequence of collaborator calls — which
//! cache operations ran, how many transport calls happened, how often state
//! was read.

use apiflow_core::cache::{Cache, CacheError, CacheFuture};
use apiflow_core::state::StateReader;
use apiflow_core::transport::{
    Response, Transport, TransportError, TransportFuture, TransportRequest,
};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex as StdMutex;
use std::sync::PoisonError;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

/// A transport that replays scripted results and records every request.
///
/// Results are consumed in script order; a call past the end of the script
/// fails with a connection error, so an unscripted transport observes "zero
/// network calls" loudly.
///
/// # Example
///
/// ```
/// use apiflow_testing::mocks::MockTransport;
/// use serde_json::json;
///
/// let transport = MockTransport::new().respond_with(200, json!({"a": 1}));
/// ```
#[derive(Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<Result<Response, TransportError>>>,
    requests: Mutex<Vec<TransportRequest>>,
}

impl MockTransport {
    /// An empty transport; any call fails with a connection error.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a response with the given status and JSON body.
    #[must_use]
    pub fn respond_with(mut self, status: u16, body: Value) -> Self {
        self.script
            .get_mut()
            .push_back(Ok(Response::with_json(status, body)));
        self
    }

    /// Script a raw-bytes response.
    #[must_use]
    pub fn respond_with_bytes(mut self, status: u16, body: Vec<u8>) -> Self {
        self.script.get_mut().push_back(Ok(Response::new(status, body)));
        self
    }

    /// Script a transport-level failure.
    #[must_use]
    pub fn fail_with(mut self, error: TransportError) -> Self {
        self.script.get_mut().push_back(Err(error));
        self
    }

    /// Every request received so far, in call order.
    pub async fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().await.clone()
    }

    /// How many calls have been made.
    pub async fn calls(&self) -> usize {
        self.requests.lock().await.len()
    }
}

impl Transport for MockTransport {
    fn call(&self, request: TransportRequest) -> TransportFuture<'_> {
        Box::pin(async move {
            self.requests.lock().await.push(request);
            self.script.lock().await.pop_front().unwrap_or_else(|| {
                Err(TransportError::Connection(
                    "no scripted response".to_string(),
                ))
            })
        })
    }
}

/// One recorded cache operation.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheOp {
    /// A `has` probe for the key.
    Has(String),
    /// A `get` read for the key.
    Get(String),
    /// A `set` write of the value under the key.
    Set(String, Value),
}

/// An in-memory cache with per-operation failure injection.
///
/// # Example
///
/// ```
/// use apiflow_testing::mocks::MockCache;
/// use serde_json::json;
///
/// let warm = MockCache::new().with_entry("/users", json!([1, 2]));
/// let broken = MockCache::new().fail_on_has();
/// ```
#[derive(Default)]
pub struct MockCache {
    entries: Mutex<HashMap<String, Value>>,
    ops: Mutex<Vec<CacheOp>>,
    fail_has: bool,
    fail_get: bool,
    fail_set: bool,
}

impl MockCache {
    /// An empty, working cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Preload an entry.
    #[must_use]
    pub fn with_entry(mut self, key: impl Into<String>, value: Value) -> Self {
        self.entries.get_mut().insert(key.into(), value);
        self
    }

    /// Make every `has` fail.
    #[must_use]
    pub const fn fail_on_has(mut self) -> Self {
        self.fail_has = true;
        self
    }

    /// Make every `get` fail.
    #[must_use]
    pub const fn fail_on_get(mut self) -> Self {
        self.fail_get = true;
        self
    }

    /// Make every `set` fail.
    #[must_use]
    pub const fn fail_on_set(mut self) -> Self {
        self.fail_set = true;
        self
    }

    /// Every operation performed so far, in call order.
    pub async fn operations(&self) -> Vec<CacheOp> {
        self.ops.lock().await.clone()
    }

    /// The value currently stored under a key.
    pub async fn stored(&self, key: &str) -> Option<Value> {
        self.entries.lock().await.get(key).cloned()
    }
}

impl Cache for MockCache {
    fn has(&self, key: &str) -> CacheFuture<'_, bool> {
        let key = key.to_string();
        Box::pin(async move {
            self.ops.lock().await.push(CacheOp::Has(key.clone()));
            if self.fail_has {
                return Err(CacheError::Probe {
                    key,
                    reason: "injected probe failure".to_string(),
                });
            }
            Ok(self.entries.lock().await.contains_key(&key))
        })
    }

    fn get(&self, key: &str) -> CacheFuture<'_, Value> {
        let key = key.to_string();
        Box::pin(async move {
            self.ops.lock().await.push(CacheOp::Get(key.clone()));
            if self.fail_get {
                return Err(CacheError::Read {
                    key,
                    reason: "injected read failure".to_string(),
                });
            }
            self.entries
                .lock()
                .await
                .get(&key)
                .cloned()
                .ok_or_else(|| CacheError::Read {
                    reason: "no value for key".to_string(),
                    key,
                })
        })
    }

    fn set(&self, key: &str, value: &Value) -> CacheFuture<'_, ()> {
        let key = key.to_string();
        let value = value.clone();
        Box::pin(async move {
            self.ops
                .lock()
                .await
                .push(CacheOp::Set(key.clone(), value.clone()));
            if self.fail_set {
                return Err(CacheError::Write {
                    key,
                    reason: "injected write failure".to_string(),
                });
            }
            self.entries.lock().await.insert(key, value);
            Ok(())
        })
    }
}

/// A state reader that always returns the same value, counting reads.
#[derive(Debug, Default)]
pub struct FixedState<S> {
    state: S,
    reads: AtomicUsize,
}

impl<S> FixedState<S> {
    /// Create a reader around a fixed state value.
    #[must_use]
    pub const fn new(state: S) -> Self {
        Self {
            state,
            reads: AtomicUsize::new(0),
        }
    }

    /// How many times the state has been read.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl<S: Clone + Send + Sync> StateReader<S> for FixedState<S> {
    fn current(&self) -> S {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.state.clone()
    }
}

/// A state reader that steps through a scripted sequence, one value per
/// read, repeating the final value once the script is exhausted.
///
/// Useful for asserting that the pipeline re-reads state at every stage
/// instead of snapshotting it once.
#[derive(Debug)]
pub struct SequenceState<S> {
    queue: StdMutex<VecDeque<S>>,
    last: StdMutex<S>,
    reads: AtomicUsize,
}

impl<S> SequenceState<S> {
    /// Create a reader whose first read returns `first`; script further
    /// values with [`then`](SequenceState::then).
    #[must_use]
    pub fn new(first: S) -> Self
    where
        S: Clone,
    {
        Self {
            queue: StdMutex::new(VecDeque::from([first.clone()])),
            last: StdMutex::new(first),
            reads: AtomicUsize::new(0),
        }
    }

    /// Script the next value to return.
    #[must_use]
    pub fn then(self, state: S) -> Self {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(state);
        self
    }

    /// How many times the state has been read.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl<S: Clone + Send> StateReader<S> for SequenceState<S> {
    fn current(&self) -> S {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let next = self
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(next) = next {
            *last = next;
        }
        last.clone()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)] // Test code can use unwrap

    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn transport_replays_script_in_order() {
        let transport = MockTransport::new()
            .respond_with(200, json!(1))
            .respond_with(500, json!(2));

        let request = TransportRequest {
            url: "/a".to_string(),
            method: apiflow_core::Method::Get,
            headers: std::collections::BTreeMap::new(),
            body: None,
            credentials: None,
            options: serde_json::Map::new(),
        };

        let first = transport.call(request.clone()).await.unwrap();
        assert!(first.ok());
        let second = transport.call(request.clone()).await.unwrap();
        assert!(!second.ok());
        assert!(transport.call(request).await.is_err());
        assert_eq!(transport.calls().await, 3);
    }

    #[tokio::test]
    async fn cache_records_operations() {
        let cache = MockCache::new().with_entry("/a", json!(1));
        assert!(cache.has("/a").await.unwrap());
        assert_eq!(cache.get("/a").await.unwrap(), json!(1));
        cache.set("/b", &json!(2)).await.unwrap();
        assert_eq!(
            cache.operations().await,
            vec![
                CacheOp::Has("/a".to_string()),
                CacheOp::Get("/a".to_string()),
                CacheOp::Set("/b".to_string(), json!(2)),
            ]
        );
        assert_eq!(cache.stored("/b").await, Some(json!(2)));
    }

    #[test]
    fn sequence_state_repeats_its_last_value() {
        let reader = SequenceState::new(1).then(2).then(3);
        assert_eq!(reader.current(), 1);
        assert_eq!(reader.current(), 2);
        assert_eq!(reader.current(), 3);
        assert_eq!(reader.current(), 3);
        assert_eq!(reader.reads(), 4);
    }
}
