//! Port abstraction for user profile persistence.
use async_trait::async_trait;

use crate::domain::{UserId, UserProfile};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by user repository adapters.
    pub enum UserPersistenceError {
        /// Repository connection could not be established.
        Connection { message: String } => "user repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "user repository query failed: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert or replace a profile at `users/{uid}`.
    async fn upsert(&self, profile: &UserProfile) -> Result<(), UserPersistenceError>;

    /// Fetch a profile by identifier.
    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserProfile>, UserPersistenceError>;
}
