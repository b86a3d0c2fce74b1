//! Domain ports defining the edges of the hexagon.
//!
//! Each trait exposes a typed error generated by [`define_port_error!`] so
//! adapters map their failures into predictable variants and services decide
//! which HTTP-facing [`crate::domain::Error`] they become.

mod macros;
pub(crate) use macros::define_port_error;

mod claims_gateway;
mod fallback_report_store;
mod identity_provider;
mod report_repository;
mod uin_lookup;
mod user_repository;

#[cfg(test)]
pub use claims_gateway::MockClaimsGateway;
pub use claims_gateway::{ClaimsError, ClaimsGateway, UnavailableClaimsGateway};
#[cfg(test)]
pub use fallback_report_store::MockFallbackReportStore;
pub use fallback_report_store::{FallbackReportStore, FallbackStoreError};
#[cfg(test)]
pub use identity_provider::MockIdentityProvider;
pub use identity_provider::{
    FIXTURE_PASSWORD, FixtureIdentityProvider, IdentityError, IdentityProvider,
};
#[cfg(test)]
pub use report_repository::MockReportRepository;
pub use report_repository::{ReportRepository, ReportRepositoryError};
#[cfg(test)]
pub use uin_lookup::MockUinLookup;
pub use uin_lookup::{UinLookup, UinLookupError};
#[cfg(test)]
pub use user_repository::MockUserRepository;
pub use user_repository::{UserPersistenceError, UserRepository};
