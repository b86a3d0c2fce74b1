//! Locate reports whose owner is not known in advance.
//!
//! Reports are keyed under their owner, so a bare UIN has to be resolved by
//! searching. Two strategies run in a fixed order, short-circuiting on the
//! first hit:
//!
//! 1. a collection-group query on the `uin` field, and
//! 2. a bounded scan of owner ids with a direct keyed read of
//!    `users/{owner}/testReports/{uin}`.
//!
//! The fallback file store is never consulted.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;
use utoipa::ToSchema;

use crate::domain::ports::{ReportRepository, ReportRepositoryError};
use crate::domain::{Error, ReportDocument, ReportPath, Uin, UserId, is_document_key};

/// Upper bound on owners probed by the key scan.
pub const MAX_OWNER_SCAN: usize = 1000;

/// Strategy that produced a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum LookupStrategy {
    /// Collection-group query on the `uin` field.
    FieldQuery,
    /// Direct keyed read under one of the enumerated owners.
    OwnerScan,
}

/// A located report with lookup diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedReport {
    pub document: ReportDocument,
    pub strategy: LookupStrategy,
    /// Keyed reads issued before the hit; zero for field-query hits.
    pub owners_probed: usize,
}

/// Map store failures onto the HTTP-facing error taxonomy.
pub(crate) fn report_store_error(error: ReportRepositoryError) -> Error {
    match error {
        ReportRepositoryError::Conflict { message } => Error::conflict(message),
        other => Error::service(other.to_string()),
    }
}

/// Read-side report service: locate, search and existence checks.
#[derive(Clone)]
pub struct ReportLocator {
    reports: Arc<dyn ReportRepository>,
}

impl ReportLocator {
    pub fn new(reports: Arc<dyn ReportRepository>) -> Self {
        Self { reports }
    }

    /// Find the first report carrying `uin`.
    ///
    /// With several field-query hits the lexicographically smallest path
    /// wins, so repeated lookups are stable.
    pub async fn locate(&self, uin: &str) -> Result<Option<LocatedReport>, Error> {
        let mut hits = self
            .reports
            .find_by_uin_field(uin)
            .await
            .map_err(report_store_error)?;
        sort_by_path(&mut hits);
        if let Some(document) = hits.into_iter().next() {
            debug!(uin, path = %document.path, "report located by field query");
            return Ok(Some(LocatedReport {
                document,
                strategy: LookupStrategy::FieldQuery,
                owners_probed: 0,
            }));
        }

        if !is_document_key(uin) {
            debug!(uin, "identifier is not a document key; skipping owner scan");
            return Ok(None);
        }

        let owners = self.owners().await?;
        let mut probed = 0;
        for owner in owners {
            probed += 1;
            let path = ReportPath::new(owner, uin);
            if let Some(document) = self.reports.get(&path).await.map_err(report_store_error)? {
                debug!(uin, path = %document.path, probed, "report located by owner scan");
                return Ok(Some(LocatedReport {
                    document,
                    strategy: LookupStrategy::OwnerScan,
                    owners_probed: probed,
                }));
            }
        }
        debug!(uin, probed, "report not found");
        Ok(None)
    }

    /// Every report carrying `uin` from both strategies, de-duplicated by
    /// path and ordered by path.
    pub async fn search(&self, uin: &str) -> Result<Vec<ReportDocument>, Error> {
        let mut found: BTreeMap<String, ReportDocument> = BTreeMap::new();
        for document in self
            .reports
            .find_by_uin_field(uin)
            .await
            .map_err(report_store_error)?
        {
            found.entry(document.path.to_string()).or_insert(document);
        }

        if is_document_key(uin) {
            for owner in self.owners().await? {
                let path = ReportPath::new(owner, uin);
                if let Some(document) =
                    self.reports.get(&path).await.map_err(report_store_error)?
                {
                    found.entry(document.path.to_string()).or_insert(document);
                }
            }
        }
        Ok(found.into_values().collect())
    }

    /// Whether any report carries `uin`.
    ///
    /// The UIN index answers first; records written before the index existed
    /// are still found through [`Self::locate`].
    pub async fn exists(&self, uin: &str) -> Result<bool, Error> {
        let uin = uin.trim();
        if uin.is_empty() {
            return Err(Error::invalid_request("uin is required"));
        }
        if let Ok(key) = Uin::new(uin) {
            let indexed = self
                .reports
                .indexed_owner(&key)
                .await
                .map_err(report_store_error)?;
            if indexed.is_some() {
                return Ok(true);
            }
        }
        Ok(self.locate(uin).await?.is_some())
    }

    /// Reports owned by `owner`.
    pub async fn list_for_owner(&self, owner: &UserId) -> Result<Vec<ReportDocument>, Error> {
        self.reports
            .list_for_owner(owner)
            .await
            .map_err(report_store_error)
    }

    async fn owners(&self) -> Result<Vec<UserId>, Error> {
        let mut owners = self
            .reports
            .list_owner_ids(MAX_OWNER_SCAN)
            .await
            .map_err(report_store_error)?;
        owners.truncate(MAX_OWNER_SCAN);
        Ok(owners)
    }
}

fn sort_by_path(documents: &mut [ReportDocument]) {
    documents.sort_by_cached_key(|document| document.path.to_string());
}

#[cfg(test)]
#[path = "report_locator_tests.rs"]
mod tests;
