//! Fluent Given-When-Then harness for pipeline tests.

#![allow(clippy::module_name_repetitions)] // PipelineTest is the natural name

use apiflow_core::call::ApiCall;
use apiflow_core::envelope::Envelope;
use apiflow_core::event::Event;
use apiflow_core::state::StateReader;
use apiflow_core::transport::Transport;
use apiflow_runtime::{Delivery, Outcome, Pipeline};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::mocks::FixedState;

/// Type alias for delivery assertion functions.
type DeliveryAssertion<S> = Box<dyn FnOnce(&[Delivery<S>])>;

/// Fluent API for testing one envelope's trip through the pipeline.
///
/// # Example
///
/// ```rust,ignore
/// use apiflow_testing::{PipelineTest, mocks::MockTransport};
///
/// PipelineTest::new()
///     .given_state_value(())
///     .with_transport(Arc::new(MockTransport::new().respond_with(200, json!({"a": 1}))))
///     .when_call(call)
///     .then_outcome(Outcome::Completed { cached: false })
///     .then_deliveries(|deliveries| {
///         assert_eq!(deliveries.len(), 2);
///     })
///     .run()
///     .await;
/// ```
pub struct PipelineTest<S> {
    state: Option<Arc<dyn StateReader<S>>>,
    transport: Option<Arc<dyn Transport>>,
    envelope: Option<Envelope<S>>,
    expected_outcome: Option<Outcome>,
    delivery_assertions: Vec<DeliveryAssertion<S>>,
}

impl<S: Send + 'static> Default for PipelineTest<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Send + 'static> PipelineTest<S> {
    /// Start an empty test.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: None,
            transport: None,
            envelope: None,
            expected_outcome: None,
            delivery_assertions: Vec::new(),
        }
    }

    /// Set the state reader (Given).
    #[must_use]
    pub fn given_state(mut self, state: Arc<dyn StateReader<S>>) -> Self {
        self.state = Some(state);
        self
    }

    /// Set a fixed state value (Given).
    #[must_use]
    pub fn given_state_value(mut self, state: S) -> Self
    where
        S: Clone + Sync,
    {
        self.state = Some(Arc::new(FixedState::new(state)));
        self
    }

    /// Set the transport.
    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Process an envelope carrying this call (When).
    #[must_use]
    pub fn when_call(self, call: ApiCall<S>) -> Self {
        self.when_envelope(Envelope::api(call))
    }

    /// Process this envelope as-is (When).
    #[must_use]
    pub fn when_envelope(mut self, envelope: Envelope<S>) -> Self {
        self.envelope = Some(envelope);
        self
    }

    /// Assert the terminal outcome (Then).
    #[must_use]
    pub const fn then_outcome(mut self, expected: Outcome) -> Self {
        self.expected_outcome = Some(expected);
        self
    }

    /// Assert over the full delivery sequence (Then).
    #[must_use]
    pub fn then_deliveries<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&[Delivery<S>]) + 'static,
    {
        self.delivery_assertions.push(Box::new(assertion));
        self
    }

    /// Run the pipeline and execute all assertions.
    ///
    /// # Panics
    ///
    /// Panics if state, transport, or envelope is not set, or if any
    /// assertion fails.
    #[allow(clippy::expect_used, clippy::panic)] // Test harness can panic
    pub async fn run(self) {
        let state = self.state.expect("state must be set with given_state()");
        let transport = self
            .transport
            .expect("transport must be set with with_transport()");
        let envelope = self
            .envelope
            .expect("envelope must be set with when_call() or when_envelope()");

        let (tx, mut rx) = mpsc::channel(16);
        let pipeline = Pipeline::new(state, transport, tx);
        let outcome = pipeline
            .process(envelope)
            .await
            .expect("delivery channel should stay open");
        drop(pipeline);

        let mut deliveries = Vec::new();
        while let Some(delivery) = rx.recv().await {
            deliveries.push(delivery);
        }

        if let Some(expected) = self.expected_outcome {
            assert_eq!(outcome, expected, "unexpected terminal outcome");
        }
        for assertion in self.delivery_assertions {
            assertion(&deliveries);
        }
    }
}

/// The events among a delivery sequence, in order, skipping forwards.
#[must_use]
pub fn events<S>(deliveries: &[Delivery<S>]) -> Vec<&Event> {
    deliveries
        .iter()
        .filter_map(|delivery| match delivery {
            Delivery::Event(event) => Some(event),
            Delivery::Forwarded(_) => None,
        })
        .collect()
}
