//! Live HTTP transport backed by `reqwest`.

use apiflow_core::call::Method;
use apiflow_core::transport::{Response, Transport, TransportError, TransportFuture, TransportRequest};
use reqwest::Client;

/// [`Transport`] implementation over a shared `reqwest` client.
///
/// Bodies are sent as JSON. The `options` bag of the request is accepted but
/// not interpreted — it exists for transports with richer configuration
/// surfaces. The credentials policy is likewise carried but not applied: it
/// is a cookie-jar concern and this client manages no cookie store.
///
/// # Examples
///
/// ```rust,no_run
/// use apiflow_runtime::HttpTransport;
/// use std::sync::Arc;
///
/// let transport = Arc::new(HttpTransport::new());
/// ```
#[derive(Clone, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport with a fresh client.
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Create a transport over an already-configured client.
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }
}

fn to_reqwest(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Head => reqwest::Method::HEAD,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
        Method::Options => reqwest::Method::OPTIONS,
    }
}

impl Transport for HttpTransport {
    fn call(&self, request: TransportRequest) -> TransportFuture<'_> {
        let client = self.client.clone();
        Box::pin(async move {
            let mut builder = client.request(to_reqwest(request.method), request.url.as_str());
            for (name, value) in &request.headers {
                builder = builder.header(name, value);
            }
            if let Some(body) = &request.body {
                builder = builder.json(body);
            }

            let response = builder.send().await.map_err(|e| {
                if e.is_builder() || e.is_request() {
                    TransportError::InvalidRequest(e.to_string())
                } else {
                    TransportError::Connection(e.to_string())
                }
            })?;

            let status = response.status().as_u16();
            let bytes = response
                .bytes()
                .await
                .map_err(|e| TransportError::Connection(e.to_string()))?;
            Ok(Response::new(status, bytes.to_vec()))
        })
    }
}
