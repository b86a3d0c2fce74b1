//! Port for the hierarchical report document store.
//!
//! Reports live in per-owner sub-collections (`users/{owner}/testReports`).
//! There is no top-level report table, so cross-owner lookups go through
//! either a collection-group field query or an owner enumeration.

use async_trait::async_trait;

use crate::domain::{ReportDocument, ReportFields, ReportPath, Uin, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by report store adapters.
    pub enum ReportRepositoryError {
        /// The store could not be reached.
        Connection { message: String } => "report store connection failed: {message}",
        /// The store rejected the credentials in use.
        Rejected { message: String } => "report store rejected credentials: {message}",
        /// A query or mutation failed.
        Query { message: String } => "report store query failed: {message}",
        /// A stored document could not be decoded.
        Decode { message: String } => "report store returned malformed data: {message}",
        /// The UIN is indexed to another owner, or the index moved concurrently.
        Conflict { message: String } => "report store conflict: {message}",
    }
}

/// Read/write access to stored reports and the UIN index.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReportRepository: Send + Sync {
    /// Collection-group query: every report whose `uin` field equals `uin`,
    /// ordered by path.
    async fn find_by_uin_field(&self, uin: &str)
    -> Result<Vec<ReportDocument>, ReportRepositoryError>;

    /// Up to `limit` owner ids, in key order. Owners that only exist as the
    /// parent of a report sub-collection are included.
    async fn list_owner_ids(&self, limit: usize) -> Result<Vec<UserId>, ReportRepositoryError>;

    /// Direct keyed read.
    async fn get(&self, path: &ReportPath) -> Result<Option<ReportDocument>, ReportRepositoryError>;

    /// Every report of one owner, ordered by key.
    async fn list_for_owner(
        &self,
        owner: &UserId,
    ) -> Result<Vec<ReportDocument>, ReportRepositoryError>;

    /// Owner recorded in the UIN index, if any.
    async fn indexed_owner(&self, uin: &Uin) -> Result<Option<UserId>, ReportRepositoryError>;

    /// Merge-upsert `fields` at `users/{owner}/testReports/{uin}`, stamp a
    /// store-assigned `createdAt`, and claim `uin` in the index, atomically.
    ///
    /// Fails with [`ReportRepositoryError::Conflict`] when the index already
    /// assigns `uin` to a different owner.
    async fn upsert_indexed(
        &self,
        owner: &UserId,
        uin: &Uin,
        fields: &ReportFields,
    ) -> Result<ReportDocument, ReportRepositoryError>;

    /// Delete a report and release its index entry. Returns whether the
    /// report existed.
    async fn delete(&self, path: &ReportPath) -> Result<bool, ReportRepositoryError>;
}
