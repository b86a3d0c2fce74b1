//! Identity service adapters.
//!
//! Implements the `IdentityProvider` and `ClaimsGateway` ports over the
//! identity service's REST endpoints.

mod dto;
mod http_source;

pub use http_source::{IdentityToolkitClaimsGateway, IdentityToolkitProvider};
