//! Port for credential claims held by the identity service.
//!
//! Claims are derived from the stored profile role; adapters only ever set
//! the claim to a given role, which makes every call idempotent.

use async_trait::async_trait;

use crate::domain::{Role, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by claims adapters.
    pub enum ClaimsError {
        /// The identity service could not be reached.
        Connection { message: String } => "claims service connection failed: {message}",
        /// The identity service refused the update.
        Rejected { message: String } => "claims service rejected the update: {message}",
        /// No credential service is configured for this process.
        Unavailable { message: String } => "claims service unavailable: {message}",
    }
}

/// Sets the authorization claim attached to a user's credential.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClaimsGateway: Send + Sync {
    /// Make the credential's claims reflect `role` (admin flag on or off).
    async fn set_role_claim(&self, uid: &UserId, role: Role) -> Result<(), ClaimsError>;
}

/// Gateway used when no elevated credentials are configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableClaimsGateway;

#[async_trait]
impl ClaimsGateway for UnavailableClaimsGateway {
    async fn set_role_claim(&self, _uid: &UserId, _role: Role) -> Result<(), ClaimsError> {
        Err(ClaimsError::unavailable(
            "no elevated credentials configured",
        ))
    }
}
