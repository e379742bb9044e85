//! The inbound envelope and intent extraction.
//!
//! Every value entering the pipeline is an [`Envelope`]: a bag of arbitrary
//! fields plus an optional marker field carrying an [`ApiCall`]. Extraction
//! is purely structural — the marker is either present or it is not — and
//! cannot fail. Envelopes without the marker are forwarded to the consumer
//! untouched; the pipeline never inspects their other fields.
//!
//! The whole envelope (marker and extra fields alike) stays visible to the
//! payload/meta transforms of the call's descriptors, so callers can thread
//! correlation data through `extra` without the pipeline knowing about it.

use crate::call::ApiCall;
use serde_json::{Map, Value};
use std::fmt;

/// An inbound value: arbitrary fields plus, when the marker field is set, an
/// API call description.
pub struct Envelope<S> {
    /// Free-form fields outside the marker. Ignored by the pipeline, visible
    /// to descriptor transforms.
    pub extra: Map<String, Value>,

    /// The marker field. `Some` marks this envelope as carrying a call.
    pub call: Option<ApiCall<S>>,
}

impl<S> Envelope<S> {
    /// An envelope with no marker — passes through the pipeline untouched.
    #[must_use]
    pub const fn plain(extra: Map<String, Value>) -> Self {
        Self { extra, call: None }
    }

    /// An envelope carrying a call under the marker field.
    #[must_use]
    pub fn api(call: ApiCall<S>) -> Self {
        Self {
            extra: Map::new(),
            call: Some(call),
        }
    }

    /// Add a free-form field.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Whether this envelope carries a call. Structural, cannot fail.
    #[must_use]
    pub const fn is_api(&self) -> bool {
        self.call.is_some()
    }

    /// The carried call, if any.
    #[must_use]
    pub const fn call(&self) -> Option<&ApiCall<S>> {
        self.call.as_ref()
    }
}

impl<S> Default for Envelope<S> {
    fn default() -> Self {
        Self::plain(Map::new())
    }
}

impl<S> Clone for Envelope<S> {
    fn clone(&self) -> Self {
        Self {
            extra: self.extra.clone(),
            call: self.call.clone(),
        }
    }
}

impl<S> fmt::Debug for Envelope<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("extra", &self.extra)
            .field("call", &self.call)
            .finish()
    }
}
