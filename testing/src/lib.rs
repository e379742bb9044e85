//! # Apiflow Testing
//!
//! Testing utilities for the apiflow request pipeline.
//!
//! This crate provides:
//! - Mock implementations of the collaborator traits ([`mocks`]):
//!   a scripted [`MockTransport`](mocks::MockTransport), a recording
//!   [`MockCache`](mocks::MockCache) with failure injection, and the
//!   [`FixedState`](mocks::FixedState) / [`SequenceState`](mocks::SequenceState)
//!   readers
//! - A fluent Given-When-Then harness for whole-pipeline assertions
//!   ([`harness::PipelineTest`])
//!
//! ## Example
//!
//! ```rust,ignore
//! use apiflow_testing::{PipelineTest, mocks::MockTransport};
//! use apiflow_runtime::Outcome;
//!
//! #[tokio::test]
//! async fn fetch_succeeds() {
//!     let transport = Arc::new(MockTransport::new().respond_with(200, json!({"a": 1})));
//!     PipelineTest::new()
//!         .given_state_value(())
//!         .with_transport(transport)
//!         .when_call(call)
//!         .then_outcome(Outcome::Completed { cached: false })
//!         .run()
//!         .await;
//! }
//! ```

pub mod harness;
pub mod mocks;

pub use harness::{PipelineTest, events};
pub use mocks::{CacheOp, FixedState, MockCache, MockTransport, SequenceState};

/// Initialize test logging from `RUST_LOG`, once per process.
///
/// Safe to call from every test; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
