//! Fetch Demo - End-to-End Pipeline Example
//!
//! Wires a pipeline to the live HTTP transport and runs two calls against a
//! public JSON API: one fully static, one resolving its endpoint and headers
//! from application state. Every delivery is printed as it arrives.
//!
//! # Running the Example
//!
//! ```bash
//! cargo run --bin fetch-demo
//! ```

#![allow(missing_docs)]
#![allow(clippy::expect_used)] // Examples can use expect

use apiflow_core::state::StateReader;
use apiflow_core::{ApiCall, Envelope, Method, RawDescriptor, Resolvable};
use apiflow_runtime::metrics::MetricsServer;
use apiflow_runtime::{Delivery, HttpTransport, Pipeline};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application state the dynamic resolvers read.
#[derive(Clone, Debug)]
struct AppState {
    base_url: String,
    user_id: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,apiflow=debug,fetch_demo=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Fetch Demo");

    // 2. Install the metrics recorder (rendering left to the embedder)
    let mut metrics = MetricsServer::new("0.0.0.0:9000".parse()?);
    metrics.start()?;

    // 3. Wire the pipeline: state reader, live transport, delivery channel
    let state: Arc<dyn StateReader<AppState>> = Arc::new(|| AppState {
        base_url: "https://jsonplaceholder.typicode.com".to_string(),
        user_id: 1,
    });
    let (tx, mut rx) = mpsc::channel(64);
    let pipeline = Pipeline::new(state, Arc::new(HttpTransport::new()), tx);

    let consumer = tokio::spawn(async move {
        while let Some(delivery) = rx.recv().await {
            match delivery {
                Delivery::Forwarded(envelope) => {
                    tracing::info!(?envelope, "forwarded non-call envelope");
                }
                Delivery::Event(event) => {
                    let rendered =
                        serde_json::to_string_pretty(&event).expect("events serialize");
                    tracing::info!(event_type = %event.id, error = event.error, "event");
                    println!("{rendered}");
                }
            }
        }
    });

    // 4. A fully static call
    let list_posts: ApiCall<AppState> = ApiCall::new(
        "https://jsonplaceholder.typicode.com/posts/1",
        Method::Get,
        [
            RawDescriptor::named("POST_REQUEST"),
            RawDescriptor::named("POST_SUCCESS"),
            RawDescriptor::named("POST_FAILURE"),
        ],
    );
    let outcome = pipeline.process(Envelope::api(list_posts)).await?;
    tracing::info!(?outcome, "static call finished");

    // 5. A call resolving endpoint and headers from state, with a meta
    //    transform stamping the user onto the success event
    let success = RawDescriptor::named("TODOS_SUCCESS")
        .with_meta(|_, state: &AppState, _| json!({ "user_id": state.user_id }));
    let list_todos = ApiCall::new(
        Resolvable::dynamic(|state: &AppState| {
            Ok(format!("{}/users/{}/todos", state.base_url, state.user_id))
        }),
        Method::Get,
        [
            RawDescriptor::named("TODOS_REQUEST"),
            success,
            RawDescriptor::named("TODOS_FAILURE"),
        ],
    )
    .with_headers(Resolvable::dynamic(|_: &AppState| {
        Ok([("accept".to_string(), "application/json".to_string())]
            .into_iter()
            .collect())
    }));
    let outcome = pipeline.process(Envelope::api(list_todos)).await?;
    tracing::info!(?outcome, "dynamic call finished");

    // 6. A non-call envelope passes through untouched
    let outcome = pipeline
        .process(Envelope::default().with_extra("kind", json!("HEARTBEAT")))
        .await?;
    tracing::info!(?outcome, "plain envelope finished");

    // Closing the sender ends the consumer
    drop(pipeline);
    consumer.await?;

    tracing::info!("✓ Demo complete");
    Ok(())
}
