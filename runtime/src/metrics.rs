//! Prometheus metrics for observability.
//!
//! Counters and histograms recorded by the pipeline:
//!
//! - `apiflow_envelopes_total` — envelopes entering the pipeline
//! - `apiflow_events_emitted_total{kind}` — emitted events, `kind` being
//!   `ok` or `error`
//! - `apiflow_cache_hits_total` — calls satisfied from the cache
//! - `apiflow_transport_failures_total` — transport-level failures
//! - `apiflow_transport_duration_seconds` — transport call latency
//!
//! # Example
//!
//! ```rust,no_run
//! use apiflow_runtime::metrics::MetricsServer;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Install the recorder; render via `server.handle()`
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//! # Ok(())
//! # }
//! ```

use ::metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Envelopes entering the pipeline.
pub const ENVELOPES_TOTAL: &str = "apiflow_envelopes_total";
/// Events emitted, labeled by kind (`ok` / `error`).
pub const EVENTS_EMITTED_TOTAL: &str = "apiflow_events_emitted_total";
/// Calls satisfied from the cache.
pub const CACHE_HITS_TOTAL: &str = "apiflow_cache_hits_total";
/// Transport-level failures.
pub const TRANSPORT_FAILURES_TOTAL: &str = "apiflow_transport_failures_total";
/// Transport call latency.
pub const TRANSPORT_DURATION_SECONDS: &str = "apiflow_transport_duration_seconds";

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build the metrics exporter.
    #[error("failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install the metrics exporter.
    #[error("failed to install metrics exporter: {0}")]
    Install(String),
}

/// Register descriptions for every metric the pipeline records.
pub fn register_metrics() {
    describe_counter!(ENVELOPES_TOTAL, "Envelopes entering the pipeline");
    describe_counter!(
        EVENTS_EMITTED_TOTAL,
        "Events emitted to the consumer, by kind"
    );
    describe_counter!(CACHE_HITS_TOTAL, "Calls satisfied from the cache");
    describe_counter!(
        TRANSPORT_FAILURES_TOTAL,
        "Transport calls that obtained no response"
    );
    describe_histogram!(
        TRANSPORT_DURATION_SECONDS,
        "Latency of transport calls in seconds"
    );
}

pub(crate) fn count_envelope() {
    ::metrics::counter!(ENVELOPES_TOTAL).increment(1);
}

pub(crate) fn count_event(error: bool) {
    let kind = if error { "error" } else { "ok" };
    ::metrics::counter!(EVENTS_EMITTED_TOTAL, "kind" => kind).increment(1);
}

pub(crate) fn count_cache_hit() {
    ::metrics::counter!(CACHE_HITS_TOTAL).increment(1);
}

pub(crate) fn count_transport_failure() {
    ::metrics::counter!(TRANSPORT_FAILURES_TOTAL).increment(1);
}

pub(crate) fn record_transport_duration(elapsed: Duration) {
    ::metrics::histogram!(TRANSPORT_DURATION_SECONDS).record(elapsed.as_secs_f64());
}

/// Prometheus metrics recorder with a renderable handle.
///
/// Install once per process; rendering (and serving the scrape endpoint) is
/// left to the embedding application via [`handle`](MetricsServer::handle).
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a metrics server for the given scrape address.
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Register metric descriptions and install the Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError`] if the exporter cannot be built or
    /// installed. A recorder already installed by an earlier instance (as
    /// happens in tests) is tolerated with a warning.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[
                    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
                ],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!(
                    addr = %self.addr,
                    "metrics recorder installed - scrape at http://{}/metrics",
                    self.addr
                );
                Ok(())
            }
            Err(e) => {
                let message = e.to_string();
                if message.contains("already initialized") {
                    tracing::warn!("metrics recorder already initialized, skipping");
                    Ok(())
                } else {
                    Err(MetricsError::Install(message))
                }
            }
        }
    }

    /// The handle for rendering the current metrics, once started.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }
}
