//! Inspection report registry backend.
//!
//! Hexagonal layout: [`domain`] holds types, use-cases and ports; [`inbound`]
//! adapts HTTP onto the use-cases; [`outbound`] implements the ports against
//! the document store, the identity service and the local fallback file.

pub mod config;
pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use domain::TraceId;
pub use middleware::Trace;
