//! Lifecycle type descriptors and their normalization.
//!
//! Each call names three output event types — request, success, failure — as
//! a [`RawDescriptor`] triple. A descriptor is either a bare identifier or an
//! identifier plus optional payload/meta transforms. Normalization expands
//! every descriptor into the uniform [`Descriptor`] record, defaulting the
//! missing transforms per lifecycle stage:
//!
//! - request: no payload, no meta (there is no response yet)
//! - success/failure: payload defaults to the decoded response body
//!
//! Normalization is pure and total; malformed descriptors never reach it
//! because validation rejects them first.

use crate::envelope::Envelope;
use crate::event::{Event, EventPayload};
use crate::transport::Response;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A payload or meta transform.
///
/// Applied only when the corresponding event is actually emitted. The
/// response argument is `None` for request-stage events (no response exists
/// yet) and `Some` for success/failure events — including the synthetic
/// response of a cache hit.
pub type Transform<S> = Arc<dyn Fn(&Envelope<S>, &S, Option<&Response>) -> Value + Send + Sync>;

/// A type descriptor as written by the caller.
pub enum RawDescriptor<S> {
    /// A bare identifier naming the event type.
    Id(String),

    /// An identifier plus optional transforms.
    Full {
        /// The event type identifier.
        id: String,
        /// Payload transform, if any.
        payload: Option<Transform<S>>,
        /// Meta transform, if any.
        meta: Option<Transform<S>>,
    },
}

impl<S> RawDescriptor<S> {
    /// A bare descriptor naming only the event type.
    pub fn named(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    /// The event type identifier, regardless of shape.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Id(id) | Self::Full { id, .. } => id,
        }
    }

    /// Attach a payload transform, promoting a bare descriptor to the full
    /// shape.
    #[must_use]
    pub fn with_payload<F>(self, f: F) -> Self
    where
        F: Fn(&Envelope<S>, &S, Option<&Response>) -> Value + Send + Sync + 'static,
    {
        let (id, _, meta) = self.into_parts();
        Self::Full {
            id,
            payload: Some(Arc::new(f)),
            meta,
        }
    }

    /// Attach a meta transform, promoting a bare descriptor to the full
    /// shape.
    #[must_use]
    pub fn with_meta<F>(self, f: F) -> Self
    where
        F: Fn(&Envelope<S>, &S, Option<&Response>) -> Value + Send + Sync + 'static,
    {
        let (id, payload, _) = self.into_parts();
        Self::Full {
            id,
            payload,
            meta: Some(Arc::new(f)),
        }
    }

    fn into_parts(self) -> (String, Option<Transform<S>>, Option<Transform<S>>) {
        match self {
            Self::Id(id) => (id, None, None),
            Self::Full { id, payload, meta } => (id, payload, meta),
        }
    }
}

impl<S> Clone for RawDescriptor<S> {
    fn clone(&self) -> Self {
        match self {
            Self::Id(id) => Self::Id(id.clone()),
            Self::Full { id, payload, meta } => Self::Full {
                id: id.clone(),
                payload: payload.clone(),
                meta: meta.clone(),
            },
        }
    }
}

// Manual Debug: transforms are opaque closures.
impl<S> fmt::Debug for RawDescriptor<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawDescriptor")
            .field("id", &self.id())
            .finish_non_exhaustive()
    }
}

/// A normalized type descriptor: always the full shape, with stage defaults
/// applied.
pub struct Descriptor<S> {
    /// The event type identifier.
    pub id: String,
    /// Payload transform, if the event carries a payload.
    pub payload: Option<Transform<S>>,
    /// Meta transform, if the event carries meta.
    pub meta: Option<Transform<S>>,
}

impl<S> Descriptor<S> {
    /// Build the event this descriptor describes.
    ///
    /// Transforms run against the original envelope, the state current at
    /// emission time, and the response when one exists. The `error` flag is
    /// always `false` here; the executor forces it for failure-class events.
    #[must_use]
    pub fn build(&self, envelope: &Envelope<S>, state: &S, response: Option<&Response>) -> Event {
        Event {
            id: self.id.clone(),
            payload: self
                .payload
                .as_ref()
                .map(|transform| EventPayload::Json(transform(envelope, state, response))),
            meta: self
                .meta
                .as_ref()
                .map(|transform| transform(envelope, state, response)),
            error: false,
        }
    }
}

impl<S> Clone for Descriptor<S> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            payload: self.payload.clone(),
            meta: self.meta.clone(),
        }
    }
}

impl<S> fmt::Debug for Descriptor<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// The normalized request/success/failure triple.
#[derive(Debug, Clone)]
pub struct Triple<S> {
    /// Descriptor for the request-started event.
    pub request: Descriptor<S>,
    /// Descriptor for the success event.
    pub success: Descriptor<S>,
    /// Descriptor for the failure event.
    pub failure: Descriptor<S>,
}

/// Expand a validated descriptor triple into its normalized form.
///
/// Pure and total: every input triple produces a triple, with the per-stage
/// defaults described in the module docs.
#[must_use]
pub fn normalize<S>(types: [RawDescriptor<S>; 3]) -> Triple<S> {
    let [request, success, failure] = types;
    Triple {
        request: normalize_one(request, None),
        success: normalize_one(success, Some(body_transform())),
        failure: normalize_one(failure, Some(body_transform())),
    }
}

fn normalize_one<S>(raw: RawDescriptor<S>, default_payload: Option<Transform<S>>) -> Descriptor<S> {
    let (id, payload, meta) = raw.into_parts();
    Descriptor {
        id,
        payload: payload.or(default_payload),
        meta,
    }
}

/// Default success/failure payload: the response body decoded as JSON, or
/// `null` when there is no response or the body is not JSON.
fn body_transform<S>() -> Transform<S> {
    Arc::new(|_envelope, _state, response| {
        response.map_or(Value::Null, |r| r.json().unwrap_or(Value::Null))
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)] // Test code can use unwrap

    use super::*;
    use serde_json::json;

    fn triple() -> [RawDescriptor<()>; 3] {
        [
            RawDescriptor::named("REQ"),
            RawDescriptor::named("OK"),
            RawDescriptor::named("FAIL"),
        ]
    }

    #[test]
    fn request_defaults_to_no_payload() {
        let normalized = normalize(triple());
        assert_eq!(normalized.request.id, "REQ");
        assert!(normalized.request.payload.is_none());
        assert!(normalized.request.meta.is_none());
    }

    #[test]
    fn success_defaults_to_decoded_body() {
        let normalized = normalize(triple());
        let response = Response::new(200, br#"{"a":1}"#.to_vec());
        let event = normalized
            .success
            .build(&Envelope::default(), &(), Some(&response));
        assert_eq!(event.id, "OK");
        assert_eq!(event.payload, Some(EventPayload::Json(json!({"a": 1}))));
        assert!(!event.error);
    }

    #[test]
    fn explicit_transforms_override_defaults() {
        let [request, _, failure] = triple();
        let success = RawDescriptor::named("OK")
            .with_payload(|_, _state, response| json!(response.map(Response::status)))
            .with_meta(|envelope, _state, _| json!(envelope.extra.len()));
        let normalized = normalize([request, success, failure]);

        let response = Response::new(204, Vec::new());
        let envelope = Envelope::default().with_extra("k", json!(1));
        let event = normalized.success.build(&envelope, &(), Some(&response));
        assert_eq!(event.payload, Some(EventPayload::Json(json!(204))));
        assert_eq!(event.meta, Some(json!(1)));
    }

    #[test]
    fn non_json_body_defaults_to_null_payload() {
        let normalized = normalize(triple());
        let response = Response::new(200, b"not json".to_vec());
        let event = normalized
            .success
            .build(&Envelope::default(), &(), Some(&response));
        assert_eq!(event.payload, Some(EventPayload::Json(Value::Null)));
    }

    #[test]
    fn id_is_readable_from_both_shapes() {
        let bare: RawDescriptor<()> = RawDescriptor::named("A");
        let full = RawDescriptor::<()>::named("B").with_payload(|_, _state, _| Value::Null);
        assert_eq!(bare.id(), "A");
        assert_eq!(full.id(), "B");
    }
}
