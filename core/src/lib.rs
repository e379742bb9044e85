//! # Apiflow Core
//!
//! Core types and traits for the apiflow request pipeline.
//!
//! Apiflow turns a declarative description of one API call — the [`ApiCall`]
//! carried inside an [`Envelope`] — into an ordered sequence of output
//! [`Event`]s describing that call's lifecycle: request-started, success,
//! failure, or one of the short-circuit error exits. The executor itself lives
//! in the `apiflow-runtime` crate; this crate provides everything it operates
//! on:
//!
//! - **Envelope & call**: the inbound value, its marker field, and the call
//!   description ([`envelope`], [`call`])
//! - **Resolvable fields**: the `Static(value)` / `Dynamic(fn)` sum type used
//!   for every field that may be computed from external state ([`resolvable`])
//! - **Type descriptors**: per-lifecycle-stage event identifiers with optional
//!   payload/meta transforms, and their normalization ([`descriptor`])
//! - **Validation**: structural checks that enumerate every defect found
//!   ([`validate`])
//! - **Output events & the error taxonomy** ([`event`])
//! - **Collaborator traits**: [`Transport`](transport::Transport),
//!   [`Cache`](cache::Cache), and [`StateReader`](state::StateReader)
//!
//! ## Design Principles
//!
//! - Descriptions, not execution: an [`ApiCall`] is a value; nothing happens
//!   until the runtime processes it
//! - Explicit dependencies: state access, caching, and HTTP are injected
//!   traits, never globals
//! - Every failure path produces exactly one well-formed event; nothing
//!   escapes the pipeline as an unhandled error
//!
//! ## Example
//!
//! ```
//! use apiflow_core::{ApiCall, Envelope, Method, RawDescriptor};
//!
//! let call: ApiCall<()> = ApiCall::new(
//!     "/users",
//!     Method::Get,
//!     [
//!         RawDescriptor::named("USERS_REQUEST"),
//!         RawDescriptor::named("USERS_SUCCESS"),
//!         RawDescriptor::named("USERS_FAILURE"),
//!     ],
//! );
//!
//! let envelope = Envelope::api(call);
//! assert!(envelope.is_api());
//! ```

pub mod cache;
pub mod call;
pub mod descriptor;
pub mod envelope;
pub mod event;
pub mod resolvable;
pub mod state;
pub mod transport;
pub mod validate;

pub use cache::{Cache, CacheError, CacheFuture};
pub use call::{ApiCall, Credentials, Method, ParseCredentialsError};
pub use descriptor::{Descriptor, RawDescriptor, Transform, Triple, normalize};
pub use envelope::Envelope;
pub use event::{CallError, Event, EventPayload};
pub use resolvable::{Resolvable, ResolveError};
pub use state::StateReader;
pub use transport::{Response, Transport, TransportError, TransportFuture, TransportRequest};
pub use validate::{Defects, reportable_type, validate};

// Re-export for downstream crates that handle defect lists
pub use smallvec::{SmallVec, smallvec};
