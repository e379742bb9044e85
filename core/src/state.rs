//! External state access.
//!
//! Dynamic fields and descriptor transforms read application state the
//! pipeline does not own. The reader is injected explicitly at pipeline
//! construction — there is no implicit global — and it is queried FRESH at
//! every stage that needs state, never snapshotted once per call. Two reads
//! within one call's processing may legitimately return different values.

/// A zero-argument query for the current external state.
///
/// Implementations must be cheap to call repeatedly; the pipeline reads
/// state once per stage that needs it.
///
/// Any `Fn() -> S` closure is a reader:
///
/// ```
/// use apiflow_core::state::StateReader;
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicU64, Ordering};
///
/// let counter = Arc::new(AtomicU64::new(41));
/// let reader = {
///     let counter = Arc::clone(&counter);
///     move || counter.load(Ordering::SeqCst)
/// };
///
/// counter.store(42, Ordering::SeqCst);
/// assert_eq!(reader.current(), 42);
/// ```
pub trait StateReader<S>: Send + Sync {
    /// Read the state as of now.
    fn current(&self) -> S;
}

impl<S, F> StateReader<S> for F
where
    F: Fn() -> S + Send + Sync,
{
    fn current(&self) -> S {
        self()
    }
}
