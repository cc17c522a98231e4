//! # Error Handling
//!
//! Errors raised by the dispatch client and its transports.

use derive_more::{Display, From};

/// Failures while preparing or sending a request.
///
/// Every variant except `Transport` is raised before any I/O happens.
#[derive(Debug, Display, From)]
pub enum ClientError {
    /// A search parameter held an object, which has no query-string form.
    #[from(ignore)]
    #[display(
        "Search parameter `{_0}` is an object. Serialize or destructure it instead of passing it whole"
    )]
    UnsupportedSearchParam(String),

    /// A route parameter was missing or not a scalar.
    #[from(ignore)]
    #[display("Invalid route parameter `{_0}`")]
    InvalidRouteParam(String),

    /// The body or parameters could not be serialized to JSON.
    #[display("Serialization Error: {_0}")]
    Serialize(serde_json::Error),

    /// The transport failed to deliver the request.
    #[from(ignore)]
    #[display("Transport Error: {_0}")]
    Transport(Box<dyn std::error::Error + Send + Sync>),
}

/// Manual implementation of the standard Error trait.
impl std::error::Error for ClientError {}

/// Failures of the default HTTP transport.
#[cfg(feature = "client")]
#[derive(Debug, Display, From)]
pub enum TransportError {
    /// The request could not be assembled.
    #[display("Invalid request: {_0}")]
    Request(ureq::http::Error),

    /// The request failed in flight.
    #[display("{_0}")]
    Ureq(ureq::Error),
}

#[cfg(feature = "client")]
impl std::error::Error for TransportError {}
