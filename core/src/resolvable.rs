//! Static-or-dynamic field resolution.
//!
//! Several fields of an [`ApiCall`](crate::ApiCall) — endpoint, headers, the
//! options bag, the bail-out condition — may be given either as a plain value
//! or as a function of the current external state. [`Resolvable`] represents
//! that choice as a sum type so call sites resolve uniformly instead of
//! branching on run-time shape.
//!
//! Dynamic resolvers read state that was current *at the moment of
//! resolution*; the pipeline re-reads state at every stage rather than
//! snapshotting it once, so two resolvers on the same call may legitimately
//! observe different states.

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Error produced by a failing dynamic resolver.
///
/// Carries only a human-readable message; the pipeline wraps it into a
/// `RequestError` event naming the stage that failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ResolveError {
    /// Human-readable description of why resolution failed.
    pub message: String,
}

impl ResolveError {
    /// Create a resolve error from any message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The resolver function stored by [`Resolvable::Dynamic`].
pub type Resolver<S, T> = Arc<dyn Fn(&S) -> Result<T, ResolveError> + Send + Sync>;

/// A field that is either a fixed value or computed from external state.
///
/// # Examples
///
/// ```
/// use apiflow_core::resolvable::Resolvable;
///
/// let fixed: Resolvable<u32, String> = Resolvable::from("/users");
/// assert_eq!(fixed.resolve(&0).unwrap(), "/users");
///
/// let computed: Resolvable<u32, String> =
///     Resolvable::dynamic(|page: &u32| Ok(format!("/users?page={page}")));
/// assert_eq!(computed.resolve(&3).unwrap(), "/users?page=3");
/// ```
pub enum Resolvable<S, T> {
    /// A fixed value, returned as-is (cloned) on every resolution.
    Static(T),

    /// A function of the current external state. May fail; the failure is
    /// surfaced as a `RequestError` event by the pipeline.
    Dynamic(Resolver<S, T>),
}

impl<S, T> Resolvable<S, T> {
    /// Wrap a resolver function.
    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn(&S) -> Result<T, ResolveError> + Send + Sync + 'static,
    {
        Self::Dynamic(Arc::new(f))
    }

    /// Whether this field needs external state to resolve.
    #[must_use]
    pub const fn is_dynamic(&self) -> bool {
        matches!(self, Self::Dynamic(_))
    }
}

impl<S, T: Clone> Resolvable<S, T> {
    /// Resolve against the given state.
    ///
    /// Static values resolve to a clone of themselves and never fail.
    ///
    /// # Errors
    ///
    /// Returns the [`ResolveError`] produced by a failing dynamic resolver.
    pub fn resolve(&self, state: &S) -> Result<T, ResolveError> {
        match self {
            Self::Static(value) => Ok(value.clone()),
            Self::Dynamic(f) => f(state),
        }
    }
}

// Manual impls: deriving would put unnecessary bounds on `S`.
impl<S, T: Clone> Clone for Resolvable<S, T> {
    fn clone(&self) -> Self {
        match self {
            Self::Static(value) => Self::Static(value.clone()),
            Self::Dynamic(f) => Self::Dynamic(Arc::clone(f)),
        }
    }
}

impl<S, T: fmt::Debug> fmt::Debug for Resolvable<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(value) => f.debug_tuple("Static").field(value).finish(),
            Self::Dynamic(_) => write!(f, "Dynamic(<resolver>)"),
        }
    }
}

impl<S, T> From<T> for Resolvable<S, T> {
    fn from(value: T) -> Self {
        Self::Static(value)
    }
}

impl<S> From<&str> for Resolvable<S, String> {
    fn from(value: &str) -> Self {
        Self::Static(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)] // Test code can use unwrap

    use super::*;

    #[test]
    fn static_value_resolves_to_clone() {
        let field: Resolvable<(), u32> = Resolvable::Static(7);
        assert_eq!(field.resolve(&()).unwrap(), 7);
        // resolving again works; the value was cloned, not consumed
        assert_eq!(field.resolve(&()).unwrap(), 7);
    }

    #[test]
    fn dynamic_resolver_sees_current_state() {
        let field: Resolvable<u32, u32> = Resolvable::dynamic(|state| Ok(state * 2));
        assert_eq!(field.resolve(&3).unwrap(), 6);
        assert_eq!(field.resolve(&5).unwrap(), 10);
    }

    #[test]
    fn dynamic_resolver_failure_propagates() {
        let field: Resolvable<(), String> =
            Resolvable::dynamic(|()| Err(ResolveError::new("token missing")));
        let err = field.resolve(&()).unwrap_err();
        assert_eq!(err.message, "token missing");
    }

    #[test]
    fn from_str_builds_static_string() {
        let field: Resolvable<(), String> = Resolvable::from("/posts");
        assert!(!field.is_dynamic());
        assert_eq!(field.resolve(&()).unwrap(), "/posts");
    }
}
