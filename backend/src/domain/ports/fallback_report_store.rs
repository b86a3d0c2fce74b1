//! Port for the local fallback report store.
//!
//! Used only when the process has no elevated document-store credentials.
//! It is a degraded substitute, not a replica: nothing reconciles it with the
//! document store and the locator never reads it.

use async_trait::async_trait;

use crate::domain::{ReportFields, Uin, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by fallback store adapters.
    pub enum FallbackStoreError {
        /// Reading or writing the backing file failed.
        Io { message: String } => "fallback store I/O failed: {message}",
        /// The backing file does not have the expected shape.
        Corrupt { message: String } => "fallback store is corrupt: {message}",
    }
}

/// Key/value store of report fields keyed by `(owner, uin)`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FallbackReportStore: Send + Sync {
    /// Merge-upsert `fields` at `(owner, uin)`.
    async fn upsert(
        &self,
        owner: &UserId,
        uin: &Uin,
        fields: &ReportFields,
    ) -> Result<(), FallbackStoreError>;

    /// Read back the fields stored at `(owner, uin)`.
    async fn get(&self, owner: &UserId, uin: &Uin)
    -> Result<Option<ReportFields>, FallbackStoreError>;
}
