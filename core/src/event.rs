//! Output events and the closed error taxonomy.
//!
//! Every lifecycle emission from the pipeline is an [`Event`]: a type
//! identifier plus optional payload and meta, with `error: true` marking
//! failure-class events. Error events always carry a member of the closed
//! [`CallError`] taxonomy as their payload; success and failure events carry
//! whatever the user-supplied transforms produced.
//!
//! Events serialize with the conventional field names (`type`, `payload`,
//! `meta`, `error`) so downstream consumers see the familiar flux-standard
//! shape.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// The closed set of pipeline-originated error payloads.
///
/// Failure events built from a non-ok HTTP response are NOT members of this
/// taxonomy — their payload comes from the user-supplied failure transform.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "name")]
pub enum CallError {
    /// Validation failed before any side effect occurred. Carries every
    /// defect found, in check order.
    #[error("invalid api call: {}", defects.join("; "))]
    InvalidCall {
        /// The full, ordered defect list.
        defects: Vec<String>,
    },

    /// Local processing failed before a server response was obtained:
    /// a bail-out condition, endpoint/header/options resolution, the cache
    /// probe, or the transport invocation itself.
    #[error("request error: {message}")]
    RequestError {
        /// Human-readable description including the underlying cause.
        message: String,
    },
}

/// Payload of an emitted event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventPayload {
    /// A transform-produced value.
    Json(Value),

    /// A pipeline-originated error. Only ever appears on events with
    /// `error: true`.
    Error(CallError),
}

/// One output event in a call's lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    /// The event type identifier, taken from the relevant descriptor.
    #[serde(rename = "type")]
    pub id: String,

    /// Event payload, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<EventPayload>,

    /// Event meta, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,

    /// Marks failure-class events. Forced to `true` by the executor for
    /// error payloads and non-ok responses, regardless of transform output.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub error: bool,
}

impl Event {
    /// A bare event with the given type and nothing else.
    #[must_use]
    pub const fn new(id: String) -> Self {
        Self {
            id,
            payload: None,
            meta: None,
            error: false,
        }
    }

    /// An error event carrying a taxonomy member as its payload.
    #[must_use]
    pub const fn failure(id: String, error: CallError) -> Self {
        Self {
            id,
            payload: Some(EventPayload::Error(error)),
            meta: None,
            error: true,
        }
    }

    /// The payload as a JSON value, when it is one.
    #[must_use]
    pub const fn payload_json(&self) -> Option<&Value> {
        match &self.payload {
            Some(EventPayload::Json(value)) => Some(value),
            _ => None,
        }
    }

    /// The payload as a taxonomy error, when it is one.
    #[must_use]
    pub const fn payload_error(&self) -> Option<&CallError> {
        match &self.payload {
            Some(EventPayload::Error(error)) => Some(error),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)] // Test code can use unwrap

    use super::*;
    use serde_json::json;

    #[test]
    fn failure_constructor_marks_the_event() {
        let event = Event::failure(
            "REQ".to_string(),
            CallError::RequestError {
                message: "connection refused".to_string(),
            },
        );
        assert!(event.error);
        assert!(matches!(
            event.payload_error(),
            Some(CallError::RequestError { .. })
        ));
    }

    #[test]
    fn serializes_with_conventional_field_names() {
        let mut event = Event::new("OK".to_string());
        event.payload = Some(EventPayload::Json(json!({"a": 1})));
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"type": "OK", "payload": {"a": 1}})
        );
    }

    #[test]
    fn error_payload_serializes_with_its_name() {
        let event = Event::failure(
            "FAIL".to_string(),
            CallError::InvalidCall {
                defects: vec!["api call must specify an endpoint".to_string()],
            },
        );
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["error"], json!(true));
        assert_eq!(value["payload"]["name"], json!("InvalidCall"));
        assert_eq!(value["payload"]["defects"][0], json!("api call must specify an endpoint"));
    }

    #[test]
    fn request_error_message_includes_cause() {
        let error = CallError::RequestError {
            message: "endpoint resolution failed: token missing".to_string(),
        };
        assert!(error.to_string().contains("token missing"));
    }
}
