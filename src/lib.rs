#![deny(missing_docs)]

//! # routegen
//!
//! Runtime half of the route contract system. The generator in `routegen-core`
//! writes an artifact with one [`Endpoint`] impl per `(method, pattern)` pair; this
//! crate sends typed requests against those impls and validates incoming requests
//! against the schemas the endpoint files declare.
//!
//! Features:
//!
//! * `client` (default): the `ureq` transport and [`validate`].
//! * `server` (default): actix-web request conversion and error responses.

pub mod client;
pub mod error;
pub mod transport;
pub mod validate;

#[cfg(feature = "server")]
pub mod server;

pub use client::{ApiClient, Endpoint, NoData, OutgoingRequest, RawInit, RequestInit};
pub use error::ClientError;
#[cfg(feature = "client")]
pub use error::TransportError;
pub use transport::Transport;
#[cfg(feature = "client")]
pub use transport::UreqTransport;
#[cfg(feature = "client")]
pub use validate::validate;
pub use validate::{validate_with, Inbound, InboundRequest, Validated, ValidationError};

pub use routegen_core::method::Method;
pub use routegen_core::schema::{self, Issue, PathSegment, Schema};

// Paths the generated artifact refers to.
#[doc(hidden)]
pub use serde;
#[doc(hidden)]
pub use serde_json;
