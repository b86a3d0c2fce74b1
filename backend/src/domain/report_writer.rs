//! Persist reports under their owner.
//!
//! The write path is chosen once when the process starts and injected as a
//! [`WriteCapability`]. Requests are validated before the capability is
//! consulted, so malformed input is rejected the same way in every mode.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value, json};
use tracing::{info, warn};

use crate::domain::ports::{FallbackReportStore, FallbackStoreError, ReportRepository};
use crate::domain::report_locator::report_store_error;
use crate::domain::{
    Error, ReportDraft, ReportPath, ReportValidationError, Uin, UserId, UserValidationError,
};

/// Write path selected at startup.
#[derive(Clone)]
pub enum WriteCapability {
    /// Elevated credentials were loaded and probed successfully.
    Privileged(Arc<dyn ReportRepository>),
    /// No elevated credentials; reports go to the local fallback file.
    LocalFallback(Arc<dyn FallbackReportStore>),
    /// No write path at all.
    Unavailable,
}

impl WriteCapability {
    pub fn mode(&self) -> WriteMode {
        match self {
            Self::Privileged(_) => WriteMode::Privileged,
            Self::LocalFallback(_) => WriteMode::LocalFallback,
            Self::Unavailable => WriteMode::Unavailable,
        }
    }
}

impl fmt::Debug for WriteCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WriteCapability").field(&self.mode()).finish()
    }
}

/// Label of a [`WriteCapability`], used in logs and readiness output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Privileged,
    LocalFallback,
    Unavailable,
}

impl WriteMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Privileged => "privileged",
            Self::LocalFallback => "local_fallback",
            Self::Unavailable => "unavailable",
        }
    }
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReceipt {
    pub uin: Uin,
    pub path: ReportPath,
    pub mode: WriteMode,
}

impl WriteReceipt {
    /// Human-readable confirmation for the caller.
    pub fn message(&self) -> &'static str {
        match self.mode {
            WriteMode::LocalFallback => "Report saved to local fallback store",
            _ => "Report saved",
        }
    }
}

/// Write-side report service.
#[derive(Clone, Debug)]
pub struct ReportWriter {
    capability: WriteCapability,
}

impl ReportWriter {
    pub fn new(capability: WriteCapability) -> Self {
        Self { capability }
    }

    pub fn mode(&self) -> WriteMode {
        self.capability.mode()
    }

    /// Validate a raw `create-report` payload and persist it.
    ///
    /// `values` must carry a `uin`; `owner` must be a valid user id.
    pub async fn create(
        &self,
        owner: Option<&str>,
        values: Option<&Map<String, Value>>,
    ) -> Result<WriteReceipt, Error> {
        let owner = owner
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .ok_or_else(|| missing("userUid"))?;
        let owner = UserId::new(owner).map_err(invalid_owner)?;
        let values = values.ok_or_else(|| missing("values"))?;
        let draft = ReportDraft::from_values(values).map_err(invalid_values)?;
        self.write(&owner, &draft).await
    }

    /// Persist an already validated draft for `owner`.
    pub async fn write(&self, owner: &UserId, draft: &ReportDraft) -> Result<WriteReceipt, Error> {
        let fields = draft.stamped(owner, None);
        let path = ReportPath::for_uin(owner.clone(), draft.uin());
        match &self.capability {
            WriteCapability::Privileged(reports) => {
                reports
                    .upsert_indexed(owner, draft.uin(), &fields)
                    .await
                    .map_err(report_store_error)?;
            }
            WriteCapability::LocalFallback(store) => {
                store
                    .upsert(owner, draft.uin(), &fields)
                    .await
                    .map_err(fallback_error)?;
                warn!(
                    owner = %owner,
                    uin = %draft.uin(),
                    "report written to local fallback store; it will not be visible to lookups"
                );
            }
            WriteCapability::Unavailable => {
                return Err(Error::not_implemented(
                    "report writes are unavailable: no elevated credentials and fallback disabled",
                ));
            }
        }
        info!(path = %path, mode = %self.mode(), "report saved");
        Ok(WriteReceipt {
            uin: draft.uin().clone(),
            path,
            mode: self.mode(),
        })
    }

    /// Delete the report at `path`. Only the privileged store supports it.
    pub async fn delete(&self, path: &ReportPath) -> Result<(), Error> {
        let WriteCapability::Privileged(reports) = &self.capability else {
            return Err(Error::not_implemented(
                "report deletion requires elevated credentials",
            ));
        };
        let existed = reports.delete(path).await.map_err(report_store_error)?;
        if existed {
            info!(path = %path, "report deleted");
            Ok(())
        } else {
            Err(Error::not_found(format!("report {path} not found")))
        }
    }
}

fn missing(field: &'static str) -> Error {
    Error::invalid_request(format!("missing required field: {field}"))
        .with_details(json!({ "field": field, "code": "missing_field" }))
}

fn invalid_owner(error: UserValidationError) -> Error {
    Error::invalid_request(format!("invalid userUid: {error}"))
        .with_details(json!({ "field": "userUid", "code": "invalid_field" }))
}

fn invalid_values(error: ReportValidationError) -> Error {
    Error::invalid_request(error.to_string())
        .with_details(json!({ "field": error.field(), "code": error.code() }))
}

fn fallback_error(error: FallbackStoreError) -> Error {
    Error::service(error.to_string())
}

#[cfg(test)]
#[path = "report_writer_tests.rs"]
mod tests;
