//! Structural validation of extracted calls.
//!
//! Validation enumerates every defect it can find — all checks run, in a
//! fixed order, and all failures are reported together rather than stopping
//! at the first. An empty defect list means the call is valid.
//!
//! Rust's types already make several of the classic defects unconstructible
//! (a bail-out that is neither boolean nor callable, headers that are not a
//! mapping, a cache missing one of its operations). What remains checkable is
//! the structure the type system cannot see: the descriptor triple's presence
//! and arity, descriptor identifiers, endpoint presence, and the credentials
//! policy spelling.

use crate::call::{ApiCall, Credentials};
use crate::resolvable::Resolvable;
use smallvec::SmallVec;

/// Defect lists are small; four slots covers every realistic call inline.
pub type Defects = SmallVec<[String; 4]>;

const STAGES: [&str; 3] = ["request", "success", "failure"];

/// Check a call structurally and enumerate every defect found.
///
/// Returns human-readable defect strings in check order; empty means valid.
#[must_use]
pub fn validate<S>(call: &ApiCall<S>) -> Defects {
    let mut defects = Defects::new();

    match &call.types {
        None => defects.push("api call must specify a types triple".to_string()),
        Some(types) => {
            if types.len() != 3 {
                defects.push(format!(
                    "types must contain exactly three descriptors (request, success, failure), got {}",
                    types.len()
                ));
            }
            for (descriptor, stage) in types.iter().zip(STAGES) {
                if descriptor.id().is_empty() {
                    defects.push(format!(
                        "{stage} descriptor must name a non-empty event type"
                    ));
                }
            }
        }
    }

    match &call.endpoint {
        None => defects.push("api call must specify an endpoint".to_string()),
        Some(Resolvable::Static(url)) if url.is_empty() => {
            defects.push("endpoint must be a non-empty string".to_string());
        }
        Some(_) => {}
    }

    if let Some(raw) = &call.credentials {
        if raw.parse::<Credentials>().is_err() {
            defects.push(format!(
                "credentials must be one of {}; got {raw:?}",
                Credentials::ACCEPTED.join(", ")
            ));
        }
    }

    defects
}

/// The event type usable for reporting a validation failure: the FIRST
/// descriptor's identifier, whichever raw shape it has.
///
/// `None` means the failure cannot be reported at all — the types triple is
/// absent or empty, or the first identifier is itself empty — and the call
/// must be dropped silently. Best-effort error reporting must never fail
/// loudly.
#[must_use]
pub fn reportable_type<S>(call: &ApiCall<S>) -> Option<String> {
    let first = call.types.as_ref()?.first()?;
    if first.id().is_empty() {
        None
    } else {
        Some(first.id().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::Method;
    use crate::descriptor::RawDescriptor;

    fn valid_call() -> ApiCall<()> {
        ApiCall::new(
            "/x",
            Method::Get,
            [
                RawDescriptor::named("REQ"),
                RawDescriptor::named("OK"),
                RawDescriptor::named("FAIL"),
            ],
        )
    }

    #[test]
    fn valid_call_has_no_defects() {
        assert!(validate(&valid_call()).is_empty());
    }

    #[test]
    fn missing_types_is_reported() {
        let mut call = valid_call();
        call.types = None;
        let defects = validate(&call);
        assert_eq!(defects.len(), 1);
        assert!(defects[0].contains("types triple"));
    }

    #[test]
    fn wrong_arity_is_reported() {
        let mut call = valid_call();
        call.types = Some(vec![
            RawDescriptor::named("REQ"),
            RawDescriptor::named("OK"),
        ]);
        let defects = validate(&call);
        assert!(defects[0].contains("exactly three"));
        assert!(defects[0].contains("got 2"));
    }

    #[test]
    fn empty_descriptor_id_names_its_stage() {
        let mut call = valid_call();
        call.types = Some(vec![
            RawDescriptor::named("REQ"),
            RawDescriptor::named(""),
            RawDescriptor::named("FAIL"),
        ]);
        let defects = validate(&call);
        assert_eq!(defects.len(), 1);
        assert!(defects[0].starts_with("success descriptor"));
    }

    #[test]
    fn missing_endpoint_and_bad_credentials_both_reported() {
        let mut call = valid_call();
        call.endpoint = None;
        call.credentials = Some("same_origin".to_string());
        let defects = validate(&call);
        assert_eq!(defects.len(), 2);
        assert!(defects[0].contains("endpoint"));
        assert!(defects[1].contains("credentials"));
    }

    #[test]
    fn empty_static_endpoint_is_a_defect() {
        let mut call = valid_call();
        call.endpoint = Some(Resolvable::from(""));
        let defects = validate(&call);
        assert_eq!(defects.len(), 1);
        assert!(defects[0].contains("non-empty"));
    }

    #[test]
    fn dynamic_endpoint_is_not_checked_for_emptiness() {
        let mut call = valid_call();
        call.endpoint = Some(Resolvable::dynamic(|_state| Ok(String::new())));
        assert!(validate(&call).is_empty());
    }

    #[test]
    fn reportable_type_reads_the_first_descriptor() {
        assert_eq!(reportable_type(&valid_call()).as_deref(), Some("REQ"));

        let mut call = valid_call();
        call.types = Some(vec![]);
        assert_eq!(reportable_type(&call), None);

        call.types = None;
        assert_eq!(reportable_type(&call), None);

        call.types = Some(vec![RawDescriptor::named("")]);
        assert_eq!(reportable_type(&call), None);
    }
}
