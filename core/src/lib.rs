#![deny(missing_docs)]

//! # routegen core
//!
//! Static analysis of endpoint files into a contract registry, and generation of
//! the typed artifact consumer code compiles against.

/// Shared error types.
pub mod error;

/// HTTP methods.
pub mod method;

/// Runtime schema builders and validation.
pub mod schema;

/// Structural descriptors derived from schemas.
pub mod descriptor;

/// Syntactic schema resolution.
pub mod resolver;

/// Generator configuration.
pub mod config;

/// File-system routing convention.
pub mod routes;

/// Companion route type files.
pub mod route_types;

/// Endpoint file analysis.
pub mod analyzer;

/// The contract registry.
pub mod registry;

/// Artifact generation.
pub mod codegen;

/// Full scan and debounced incremental updates.
pub mod controller;

pub use analyzer::{AnalysisResult, Analyzer};
pub use codegen::{emit, serialize, CodegenOptions};
pub use config::GeneratorConfig;
pub use controller::{ArtifactSink, Controller, Debouncer, FileSink, FlushState};
pub use descriptor::{to_descriptor, ObjectDescriptor, PrimitiveKind, SchemaDescriptor};
pub use error::{AppError, AppResult};
pub use method::Method;
pub use registry::{ContractDescriptor, Registry, RouteEntry};
pub use resolver::{BuilderExprResolver, TypeResolver};
pub use routes::RouteLayout;
pub use schema::{Issue, PathSegment, Schema};
