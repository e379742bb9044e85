//! # Apiflow Runtime
//!
//! The pipeline executor for apiflow: takes envelopes in, pushes deliveries
//! out.
//!
//! [`Pipeline::process`] runs one envelope through the ordered stage
//! sequence — extraction, validation, normalization, bail-out, endpoint
//! resolution, cache probe, header and options resolution, request-started
//! emission, the transport call, and response dispatch. Every stage is a
//! potential early exit, and every exit path produces at most one final
//! event; the request-started emission is the only non-terminal one.
//!
//! ## Stage machine
//!
//! ```text
//!            ┌──────────────┐   no marker    ┌─────────────┐
//! envelope ─►│  extraction  ├───────────────►│  forwarded  │
//!            └──────┬───────┘                └─────────────┘
//!                   ▼
//!            ┌──────────────┐  defects  ┌──────────────────────────┐
//!            │  validation  ├──────────►│ InvalidCall event,       │
//!            └──────┬───────┘           │ or silent drop when the  │
//!                   ▼                   │ first descriptor is      │
//!            ┌──────────────┐           │ unusable                 │
//!            │  normalize   │           └──────────────────────────┘
//!            └──────┬───────┘
//!                   ▼
//!       bail-out ─► endpoint ─► cache probe ─► headers ─► options
//!                   │               │ hit
//!                   │               ▼
//!                   │        request event ─► success event (cached)
//!                   ▼
//!            request event ─► transport ─► success / failure event
//! ```
//!
//! Any resolve/probe/call stage can exit directly with one `RequestError`
//! event. Bail-out is the only silent exit for a valid call.
//!
//! ## Concurrency
//!
//! Stages run strictly sequentially within one envelope. The pipeline is
//! `Clone` (everything shared is behind `Arc`); process as many envelopes
//! concurrently as you like, each through its own `process` call. No
//! ordering holds between concurrent envelopes' deliveries — only within one
//! envelope (its request event strictly precedes its terminal event). No
//! retries, no cancellation, no timeouts: once the transport call starts it
//! runs to completion or transport failure.
//!
//! ## Example
//!
//! ```rust,ignore
//! use apiflow_runtime::{Delivery, Pipeline};
//!
//! let (tx, mut rx) = tokio::sync::mpsc::channel(64);
//! let pipeline = Pipeline::new(state_reader, transport, tx);
//!
//! pipeline.process(envelope).await?;
//! while let Some(delivery) = rx.recv().await {
//!     match delivery {
//!         Delivery::Forwarded(other) => next_consumer(other),
//!         Delivery::Event(event) => dispatch(event),
//!     }
//! }
//! ```

use apiflow_core::cache::Cache;
use apiflow_core::call::Credentials;
use apiflow_core::descriptor::{Descriptor, RawDescriptor, normalize};
use apiflow_core::envelope::Envelope;
use apiflow_core::event::{CallError, Event, EventPayload};
use apiflow_core::state::StateReader;
use apiflow_core::transport::{Response, Transport, TransportRequest};
use apiflow_core::validate::{reportable_type, validate};
use serde_json::Map;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::mpsc;

pub mod metrics;
pub mod transport;

pub use transport::HttpTransport;

/// Errors from the pipeline itself.
///
/// Stage failures never surface here — each one is converted into exactly
/// one emitted event. The only way `process` fails is losing its consumer.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The delivery channel closed; the consumer is gone.
    #[error("delivery channel closed")]
    ChannelClosed,
}

/// One unit handed to the consumer, in emission order.
pub enum Delivery<S> {
    /// A non-intent envelope, forwarded untouched.
    Forwarded(Envelope<S>),

    /// A lifecycle event for some call.
    Event(Event),
}

impl<S> fmt::Debug for Delivery<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forwarded(envelope) => f.debug_tuple("Forwarded").field(envelope).finish(),
            Self::Event(event) => f.debug_tuple("Event").field(event).finish(),
        }
    }
}

/// Terminal state of one envelope's processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// No call marker; the envelope was forwarded untouched.
    Forwarded,

    /// The call was unusable and unreportable; nothing was emitted.
    Dropped,

    /// Validation failed; one `InvalidCall` event was emitted.
    Invalid,

    /// The bail-out condition held; nothing was emitted.
    BailedOut,

    /// A local stage failed; one `RequestError` event was emitted.
    Errored,

    /// Request and success events were emitted. `cached` distinguishes a
    /// cache hit from a live transport call.
    Completed {
        /// Whether the success came from the cache instead of the network.
        cached: bool,
    },

    /// The transport returned a non-ok status; request and failure events
    /// were emitted.
    Failed,
}

/// The request pipeline.
///
/// Holds its collaborators behind `Arc` and is cheap to clone; one clone per
/// concurrent processor is the intended pattern.
pub struct Pipeline<S> {
    state: Arc<dyn StateReader<S>>,
    transport: Arc<dyn Transport>,
    deliveries: mpsc::Sender<Delivery<S>>,
}

impl<S> Clone for Pipeline<S> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            transport: Arc::clone(&self.transport),
            deliveries: self.deliveries.clone(),
        }
    }
}

impl<S> fmt::Debug for Pipeline<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline").finish_non_exhaustive()
    }
}

impl<S: Send + 'static> Pipeline<S> {
    /// Create a pipeline over its three collaborators.
    pub fn new(
        state: Arc<dyn StateReader<S>>,
        transport: Arc<dyn Transport>,
        deliveries: mpsc::Sender<Delivery<S>>,
    ) -> Self {
        Self {
            state,
            transport,
            deliveries,
        }
    }

    /// Process one envelope to its terminal state.
    ///
    /// Emits zero or more deliveries on the way (see the module docs for the
    /// stage machine) and returns the terminal [`Outcome`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ChannelClosed`] only when a delivery cannot
    /// be handed to the consumer. Stage failures are reported as events, not
    /// errors.
    #[tracing::instrument(skip(self, envelope), name = "pipeline_process")]
    pub async fn process(&self, envelope: Envelope<S>) -> Result<Outcome, PipelineError> {
        metrics::count_envelope();

        // Extraction: structural, cannot fail. Non-intents pass through.
        if !envelope.is_api() {
            tracing::trace!("no call marker, forwarding untouched");
            self.deliver(Delivery::Forwarded(envelope)).await?;
            return Ok(Outcome::Forwarded);
        }
        let Some(call) = envelope.call.clone() else {
            return Ok(Outcome::Dropped); // unreachable: is_api() was true
        };

        // Validation: enumerate every defect, report on the first
        // descriptor's type, or drop silently when even that is unusable.
        let defects = validate(&call);
        if !defects.is_empty() {
            return match reportable_type(&call) {
                Some(id) => {
                    tracing::warn!(?defects, "rejecting malformed api call");
                    self.emit(Event::failure(
                        id,
                        CallError::InvalidCall {
                            defects: defects.into_vec(),
                        },
                    ))
                    .await?;
                    Ok(Outcome::Invalid)
                }
                None => {
                    tracing::warn!(?defects, "dropping api call with unusable first descriptor");
                    Ok(Outcome::Dropped)
                }
            };
        }

        // Normalization. Validation guarantees a triple; the fallbacks exist
        // only to keep this total without panicking paths.
        let Some(raw_types) = call.types.clone() else {
            return Ok(Outcome::Dropped);
        };
        let Ok(raw_types) = <[RawDescriptor<S>; 3]>::try_from(raw_types) else {
            return Ok(Outcome::Dropped);
        };
        let types = normalize(raw_types);

        // Stage 1: bail-out. Truthy means stop with no output at all.
        if let Some(bailout) = &call.bailout {
            match bailout.resolve(&self.state.current()) {
                Ok(true) => {
                    tracing::debug!("bail-out condition held, suppressing call");
                    return Ok(Outcome::BailedOut);
                }
                Ok(false) => {}
                Err(e) => {
                    return self
                        .request_error(&envelope, &types.request, format!("bail-out condition failed: {e}"))
                        .await;
                }
            }
        }

        // Stage 2: endpoint resolution.
        let endpoint = match &call.endpoint {
            Some(resolvable) => match resolvable.resolve(&self.state.current()) {
                Ok(url) => url,
                Err(e) => {
                    return self
                        .request_error(&envelope, &types.request, format!("endpoint resolution failed: {e}"))
                        .await;
                }
            },
            None => return Ok(Outcome::Dropped), // unreachable: validated
        };

        // Stage 3: cache probe. A hit skips header/options resolution and
        // the transport entirely; the request event still precedes the
        // success event.
        if let Some(cache) = &call.cache {
            match probe(cache.as_ref(), &endpoint).await {
                Ok(Some(response)) => {
                    metrics::count_cache_hit();
                    tracing::debug!(%endpoint, "cache hit, skipping transport");
                    let started = types.request.build(&envelope, &self.state.current(), None);
                    self.emit(started).await?;
                    let event = types
                        .success
                        .build(&envelope, &self.state.current(), Some(&response));
                    self.emit(event).await?;
                    return Ok(Outcome::Completed { cached: true });
                }
                Ok(None) => tracing::trace!(%endpoint, "cache miss"),
                Err(e) => {
                    return self
                        .request_error(&envelope, &types.request, format!("cache lookup failed: {e}"))
                        .await;
                }
            }
        }

        // Stage 4: header resolution. Defaults to an empty mapping.
        let headers = match &call.headers {
            Some(resolvable) => match resolvable.resolve(&self.state.current()) {
                Ok(headers) => headers,
                Err(e) => {
                    return self
                        .request_error(&envelope, &types.request, format!("header resolution failed: {e}"))
                        .await;
                }
            },
            None => BTreeMap::new(),
        };

        // Stage 5: options bag resolution. Transport-specific fields always
        // win, so their keys are stripped from the bag.
        let options = match &call.options {
            Some(resolvable) => match resolvable.resolve(&self.state.current()) {
                Ok(mut options) => {
                    for reserved in ["method", "body", "credentials", "headers"] {
                        options.remove(reserved);
                    }
                    options
                }
                Err(e) => {
                    return self
                        .request_error(&envelope, &types.request, format!("options resolution failed: {e}"))
                        .await;
                }
            },
            None => Map::new(),
        };

        // Stage 6: request-started. Exactly once, always before the call.
        let started = types.request.build(&envelope, &self.state.current(), None);
        self.emit(started).await?;

        // Stage 7: the transport call.
        // Validation guarantees the credentials text parses.
        let credentials = call
            .credentials
            .as_deref()
            .and_then(|raw| raw.parse::<Credentials>().ok());
        let request = TransportRequest {
            url: endpoint.clone(),
            method: call.method,
            headers,
            body: call.body.clone(),
            credentials,
            options,
        };
        tracing::debug!(url = %request.url, method = %request.method, "calling transport");
        let start = Instant::now();
        let outcome = self.transport.call(request).await;
        metrics::record_transport_duration(start.elapsed());
        let response = match outcome {
            Ok(response) => response,
            Err(e) => {
                metrics::count_transport_failure();
                return self
                    .request_error(&envelope, &types.request, format!("transport call failed: {e}"))
                    .await;
            }
        };

        // Stage 8: response dispatch.
        if response.ok() {
            let event = types
                .success
                .build(&envelope, &self.state.current(), Some(&response));
            if let Some(cache) = &call.cache {
                // Best-effort write-through; the emitted event is unaffected.
                if let Some(EventPayload::Json(payload)) = &event.payload {
                    if let Err(e) = cache.set(&endpoint, payload).await {
                        tracing::warn!(%endpoint, error = %e, "cache write failed");
                    }
                }
            }
            self.emit(event).await?;
            Ok(Outcome::Completed { cached: false })
        } else {
            tracing::debug!(status = response.status(), "non-ok response");
            let mut event = types
                .failure
                .build(&envelope, &self.state.current(), Some(&response));
            // Forced regardless of what the transform produced.
            event.error = true;
            self.emit(event).await?;
            Ok(Outcome::Failed)
        }
    }

    /// Emit one `RequestError` event through the request descriptor and
    /// finish in the `Errored` state.
    async fn request_error(
        &self,
        envelope: &Envelope<S>,
        request: &Descriptor<S>,
        message: String,
    ) -> Result<Outcome, PipelineError> {
        tracing::warn!(%message, "call failed before a response was obtained");
        let mut event = Event::failure(request.id.clone(), CallError::RequestError { message });
        // The request descriptor's meta transform still applies; its payload
        // transform is displaced by the error.
        event.meta = request
            .meta
            .as_ref()
            .map(|transform| transform(envelope, &self.state.current(), None));
        self.emit(event).await?;
        Ok(Outcome::Errored)
    }

    async fn emit(&self, event: Event) -> Result<(), PipelineError> {
        metrics::count_event(event.error);
        self.deliver(Delivery::Event(event)).await
    }

    async fn deliver(&self, delivery: Delivery<S>) -> Result<(), PipelineError> {
        self.deliveries
            .send(delivery)
            .await
            .map_err(|_| PipelineError::ChannelClosed)
    }
}

/// Probe the cache: `get` only after a truthful `has`, never falling through
/// to the network on failure.
async fn probe(
    cache: &dyn Cache,
    endpoint: &str,
) -> Result<Option<Response>, apiflow_core::cache::CacheError> {
    if cache.has(endpoint).await? {
        let value = cache.get(endpoint).await?;
        Ok(Some(Response::cached(value)))
    } else {
        Ok(None)
    }
}
