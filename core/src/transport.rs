//! The transport interface and response type.
//!
//! The transport performs the actual network request. A transport-level
//! failure — the request could not be built, the connection failed, no
//! response was obtained at all — is a [`TransportError`]. An HTTP-level
//! failure status is NOT a transport error: it is a successful transport call
//! carrying a non-ok [`Response`], dispatched through the failure descriptor.
//!
//! The shipped implementation lives in `apiflow-runtime`
//! (`HttpTransport`); tests use the mock in `apiflow-testing`.

use crate::call::{Credentials, Headers, Method};
use serde_json::{Map, Value};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors from the transport itself — anything that prevented obtaining a
/// response at all.
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    /// The request could not be constructed (bad URL, bad header name, ...).
    #[error("failed to build request: {0}")]
    InvalidRequest(String),

    /// Connectivity failure: DNS, refused connection, broken stream.
    #[error("connection failed: {0}")]
    Connection(String),

    /// A response body accessor could not decode the body.
    #[error("failed to decode response body: {0}")]
    Decode(String),
}

/// Everything a transport needs to perform one call.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// Fully resolved URL.
    pub url: String,
    /// HTTP method.
    pub method: Method,
    /// Resolved headers (empty when the call declared none).
    pub headers: Headers,
    /// Opaque body, if any.
    pub body: Option<Value>,
    /// Validated credentials policy, if any.
    pub credentials: Option<Credentials>,
    /// Extra options from the call's options bag. The dedicated fields above
    /// always take precedence; the pipeline strips their keys from this map
    /// before handing it over.
    pub options: Map<String, Value>,
}

// Body representation: live responses hold raw bytes and decode lazily;
// synthetic cache-hit responses hold the already-decoded value.
#[derive(Debug, Clone)]
enum Body {
    Bytes(Vec<u8>),
    Json(Value),
}

/// A response as seen by the pipeline: a status plus lazily decoded body
/// accessors.
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    body: Body,
}

impl Response {
    /// A live response from raw status and body bytes.
    #[must_use]
    pub const fn new(status: u16, body: Vec<u8>) -> Self {
        Self {
            status,
            body: Body::Bytes(body),
        }
    }

    /// A response holding an already-decoded JSON body.
    #[must_use]
    pub const fn with_json(status: u16, body: Value) -> Self {
        Self {
            status,
            body: Body::Json(body),
        }
    }

    /// The synthetic ok response wrapping a cached value.
    ///
    /// Known wart, preserved deliberately: a cache hit reuses the success
    /// descriptor and presents the cached payload as if a transport call had
    /// returned status 200. A transform author inspecting the response cannot
    /// distinguish "cache hit" from "transport success".
    #[must_use]
    pub const fn cached(value: Value) -> Self {
        Self::with_json(200, value)
    }

    /// The HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Whether the status is in the 2xx range.
    #[must_use]
    pub const fn ok(&self) -> bool {
        matches!(self.status, 200..=299)
    }

    /// Decode the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Decode`] when the body bytes are not valid
    /// JSON. Synthetic responses never fail here.
    pub fn json(&self) -> Result<Value, TransportError> {
        match &self.body {
            Body::Bytes(bytes) => {
                serde_json::from_slice(bytes).map_err(|e| TransportError::Decode(e.to_string()))
            }
            Body::Json(value) => Ok(value.clone()),
        }
    }

    /// The body as text.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Decode`] when the body bytes are not valid
    /// UTF-8.
    pub fn text(&self) -> Result<String, TransportError> {
        match &self.body {
            Body::Bytes(bytes) => String::from_utf8(bytes.clone())
                .map_err(|e| TransportError::Decode(e.to_string())),
            Body::Json(value) => Ok(value.to_string()),
        }
    }
}

/// Future type returned by [`Transport::call`].
pub type TransportFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Response, TransportError>> + Send + 'a>>;

/// Performs one network request.
///
/// # Dyn Compatibility
///
/// Returns `Pin<Box<dyn Future>>` instead of using `async fn` so the
/// pipeline can hold `Arc<dyn Transport>`.
pub trait Transport: Send + Sync {
    /// Perform the request and produce a response.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] only when no response could be obtained;
    /// a non-ok HTTP status is a successful call.
    fn call(&self, request: TransportRequest) -> TransportFuture<'_>;
}
