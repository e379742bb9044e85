//! The API call description and its fixed vocabularies.
//!
//! An [`ApiCall`] is a pure description of one HTTP request plus the
//! lifecycle metadata the pipeline needs: which events to emit, whether to
//! bail out, and which cache (if any) may short-circuit the transport.
//! Constructing one performs no I/O.

use crate::cache::Cache;
use crate::descriptor::RawDescriptor;
use crate::resolvable::Resolvable;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    /// GET
    Get,
    /// HEAD
    Head,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
    /// OPTIONS
    Options,
}

impl Method {
    /// The canonical wire spelling of this method.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Credentials policy for the transport, mirroring the fetch vocabulary.
///
/// How (or whether) a policy is honored is up to the [`Transport`]
/// implementation; the pipeline only validates and forwards it.
///
/// [`Transport`]: crate::transport::Transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Credentials {
    /// Never send credentials.
    Omit,
    /// Send credentials for same-origin requests only.
    SameOrigin,
    /// Always send credentials.
    Include,
}

impl Credentials {
    /// The accepted policy spellings, in canonical order.
    pub const ACCEPTED: [&'static str; 3] = ["omit", "same-origin", "include"];

    /// The canonical spelling of this policy.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Omit => "omit",
            Self::SameOrigin => "same-origin",
            Self::Include => "include",
        }
    }
}

impl fmt::Display for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error from parsing a credentials policy string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown credentials policy {0:?} (accepted: omit, same-origin, include)")]
pub struct ParseCredentialsError(pub String);

impl FromStr for Credentials {
    type Err = ParseCredentialsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "omit" => Ok(Self::Omit),
            "same-origin" => Ok(Self::SameOrigin),
            "include" => Ok(Self::Include),
            other => Err(ParseCredentialsError(other.to_string())),
        }
    }
}

/// Header names are compared case-insensitively by transports; the call
/// carries them as given.
pub type Headers = BTreeMap<String, String>;

/// A declarative description of one API call.
///
/// Fields that may depend on external state (`endpoint`, `headers`,
/// `options`, `bailout`) are [`Resolvable`]; the pipeline resolves each
/// against a fresh state read at its own stage.
///
/// The fields are public so malformed calls remain constructible — the
/// pipeline validates structurally and reports every defect rather than
/// relying on construction-time checks. [`ApiCall::new`] builds a
/// well-formed call.
///
/// # Examples
///
/// ```
/// use apiflow_core::{ApiCall, Method, RawDescriptor, Resolvable};
///
/// struct Session { token: String }
///
/// let call = ApiCall::new(
///     "/orders",
///     Method::Post,
///     [
///         RawDescriptor::named("ORDERS_REQUEST"),
///         RawDescriptor::named("ORDERS_SUCCESS"),
///         RawDescriptor::named("ORDERS_FAILURE"),
///     ],
/// )
/// .with_headers(Resolvable::dynamic(|session: &Session| {
///     Ok([("authorization".to_string(), session.token.clone())]
///         .into_iter()
///         .collect())
/// }))
/// .with_credentials("include");
/// ```
pub struct ApiCall<S> {
    /// Final URL, or a resolver computing it from external state.
    pub endpoint: Option<Resolvable<S, String>>,

    /// HTTP method.
    pub method: Method,

    /// Request headers, or a resolver computing them. Defaults to empty.
    pub headers: Option<Resolvable<S, Headers>>,

    /// Opaque request body, handed to the transport untouched.
    pub body: Option<Value>,

    /// Raw credentials policy text. Kept raw so validation can report
    /// unknown policies as a defect instead of failing construction.
    pub credentials: Option<String>,

    /// Pre-flight suppression condition. Truthy means the call is skipped
    /// with no output at all.
    pub bailout: Option<Resolvable<S, bool>>,

    /// Generic options bag merged into the transport request. The dedicated
    /// fields (method, body, credentials, headers) always take precedence.
    pub options: Option<Resolvable<S, Map<String, Value>>>,

    /// The request/success/failure descriptor triple, in that order.
    pub types: Option<Vec<RawDescriptor<S>>>,

    /// Optional cache consulted before and written after the transport call.
    pub cache: Option<Arc<dyn Cache>>,
}

impl<S> ApiCall<S> {
    /// Build a well-formed call from the three required pieces.
    pub fn new(
        endpoint: impl Into<Resolvable<S, String>>,
        method: Method,
        types: [RawDescriptor<S>; 3],
    ) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            method,
            headers: None,
            body: None,
            credentials: None,
            bailout: None,
            options: None,
            types: Some(types.into()),
            cache: None,
        }
    }

    /// Set the request headers.
    #[must_use]
    pub fn with_headers(mut self, headers: impl Into<Resolvable<S, Headers>>) -> Self {
        self.headers = Some(headers.into());
        self
    }

    /// Set the request body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Set the credentials policy (validated later, not here).
    #[must_use]
    pub fn with_credentials(mut self, credentials: impl Into<String>) -> Self {
        self.credentials = Some(credentials.into());
        self
    }

    /// Set the bail-out condition.
    #[must_use]
    pub fn with_bailout(mut self, bailout: impl Into<Resolvable<S, bool>>) -> Self {
        self.bailout = Some(bailout.into());
        self
    }

    /// Set the generic options bag.
    #[must_use]
    pub fn with_options(mut self, options: impl Into<Resolvable<S, Map<String, Value>>>) -> Self {
        self.options = Some(options.into());
        self
    }

    /// Attach a cache capability.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }
}

// Manual impls: deriving would require `S: Clone` / `S: Debug`, which the
// call never actually needs.
impl<S> Clone for ApiCall<S> {
    fn clone(&self) -> Self {
        Self {
            endpoint: self.endpoint.clone(),
            method: self.method,
            headers: self.headers.clone(),
            body: self.body.clone(),
            credentials: self.credentials.clone(),
            bailout: self.bailout.clone(),
            options: self.options.clone(),
            types: self.types.clone(),
            cache: self.cache.clone(),
        }
    }
}

impl<S> fmt::Debug for ApiCall<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCall")
            .field("endpoint", &self.endpoint)
            .field("method", &self.method)
            .field("headers", &self.headers)
            .field("body", &self.body)
            .field("credentials", &self.credentials)
            .field("bailout", &self.bailout.as_ref().map(|_| "<condition>"))
            .field("options", &self.options.as_ref().map(|_| "<options>"))
            .field("types", &self.types)
            .field("cache", &self.cache.as_ref().map(|_| "<cache>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)] // Test code can use unwrap

    use super::*;
    use crate::descriptor::RawDescriptor;

    #[test]
    fn method_wire_spelling() {
        assert_eq!(Method::Get.as_str(), "GET");
        assert_eq!(Method::Patch.to_string(), "PATCH");
    }

    #[test]
    fn credentials_parse_accepted_set() {
        for accepted in Credentials::ACCEPTED {
            assert!(accepted.parse::<Credentials>().is_ok());
        }
        assert_eq!(
            "same-origin".parse::<Credentials>().unwrap(),
            Credentials::SameOrigin
        );
    }

    #[test]
    fn credentials_parse_rejects_unknown_policy() {
        let err = "same_origin".parse::<Credentials>().unwrap_err();
        assert!(err.to_string().contains("same_origin"));
    }

    #[test]
    fn new_builds_a_complete_call() {
        let call: ApiCall<()> = ApiCall::new(
            "/x",
            Method::Get,
            [
                RawDescriptor::named("REQ"),
                RawDescriptor::named("OK"),
                RawDescriptor::named("FAIL"),
            ],
        );
        assert!(call.endpoint.is_some());
        assert_eq!(call.types.as_ref().map(Vec::len), Some(3));
        assert!(call.cache.is_none());
    }
}
