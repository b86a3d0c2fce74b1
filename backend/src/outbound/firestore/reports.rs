//! Report repository backed by the document store REST API.

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tracing::warn;

use super::client::{FirestoreClient, FirestoreError, StoredDocument};
use super::value::{encode_fields, field_path};
use crate::domain::ports::{ReportRepository, ReportRepositoryError};
use crate::domain::{
    REPORTS_COLLECTION, ReportDocument, ReportFields, ReportPath, USERS_COLLECTION, Uin, UserId,
    is_document_key,
};

/// Collection holding one document per claimed UIN.
pub const UIN_INDEX_COLLECTION: &str = "uinIndex";

impl From<FirestoreError> for ReportRepositoryError {
    fn from(error: FirestoreError) -> Self {
        match error {
            FirestoreError::Transport(message) => Self::connection(message),
            FirestoreError::Rejected { message, .. } => Self::rejected(message),
            FirestoreError::Precondition(message) => Self::conflict(format!(
                "UIN index changed concurrently; retry the write: {message}"
            )),
            FirestoreError::Status { status, message } => {
                Self::query(format!("status {status}: {message}"))
            }
            FirestoreError::Decode(message) => Self::decode(message),
        }
    }
}

/// [`ReportRepository`] over the document store.
#[derive(Clone)]
pub struct FirestoreReportRepository {
    client: FirestoreClient,
}

impl FirestoreReportRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    fn to_report(stored: StoredDocument) -> Option<ReportDocument> {
        match ReportPath::parse(&stored.path) {
            Ok(path) => Some(ReportDocument::new(
                path,
                ReportFields::from_stored(stored.fields),
            )),
            Err(error) => {
                warn!(path = %stored.path, %error, "ignoring report outside users/*/testReports");
                None
            }
        }
    }

    async fn index_entry(&self, uin: &str) -> Result<Option<StoredDocument>, FirestoreError> {
        self.client
            .get(&format!("{UIN_INDEX_COLLECTION}/{uin}"))
            .await
    }

    /// The report merge-update and its index entry, committed together.
    /// `createdAt` is always server-assigned.
    fn upsert_writes(
        &self,
        owner: &UserId,
        uin: &Uin,
        fields: &ReportFields,
        precondition: Value,
    ) -> Vec<Value> {
        let path = ReportPath::for_uin(owner.clone(), uin);
        let mut body = fields.to_map();
        body.remove("createdAt");
        let mask: Vec<String> = body.keys().map(|key| field_path(key)).collect();
        let report_write = json!({
            "update": {
                "name": self.client.document_name(&path.to_string()),
                "fields": encode_fields(&body),
            },
            "updateMask": { "fieldPaths": mask },
            "updateTransforms": [
                { "fieldPath": "createdAt", "setToServerValue": "REQUEST_TIME" }
            ],
        });
        let index_body = Map::from_iter([
            ("ownerUid".to_owned(), Value::String(owner.to_string())),
            ("path".to_owned(), Value::String(path.to_string())),
        ]);
        let index_write = json!({
            "update": {
                "name": self.client.document_name(&format!("{UIN_INDEX_COLLECTION}/{uin}")),
                "fields": encode_fields(&index_body),
            },
            "currentDocument": precondition,
        });
        vec![report_write, index_write]
    }
}

fn indexed_path(entry: &StoredDocument) -> Option<ReportPath> {
    entry
        .fields
        .get("path")
        .and_then(Value::as_str)
        .and_then(|raw| ReportPath::parse(raw).ok())
}

#[async_trait]
impl ReportRepository for FirestoreReportRepository {
    async fn find_by_uin_field(
        &self,
        uin: &str,
    ) -> Result<Vec<ReportDocument>, ReportRepositoryError> {
        let hits = self
            .client
            .query_collection_group(REPORTS_COLLECTION, "uin", json!({ "stringValue": uin }))
            .await?;
        Ok(hits.into_iter().filter_map(Self::to_report).collect())
    }

    async fn list_owner_ids(&self, limit: usize) -> Result<Vec<UserId>, ReportRepositoryError> {
        let ids = self.client.list_ids(USERS_COLLECTION, limit).await?;
        Ok(ids
            .into_iter()
            .filter_map(|id| match UserId::new(id.as_str()) {
                Ok(owner) => Some(owner),
                Err(error) => {
                    warn!(id = %id, %error, "skipping unusable owner id");
                    None
                }
            })
            .collect())
    }

    async fn get(&self, path: &ReportPath) -> Result<Option<ReportDocument>, ReportRepositoryError> {
        let stored = self.client.get(&path.to_string()).await?;
        Ok(stored.and_then(Self::to_report))
    }

    async fn list_for_owner(
        &self,
        owner: &UserId,
    ) -> Result<Vec<ReportDocument>, ReportRepositoryError> {
        let collection = format!("{USERS_COLLECTION}/{owner}/{REPORTS_COLLECTION}");
        let documents = self.client.list_documents(&collection).await?;
        Ok(documents.into_iter().filter_map(Self::to_report).collect())
    }

    async fn indexed_owner(&self, uin: &Uin) -> Result<Option<UserId>, ReportRepositoryError> {
        let entry = self.index_entry(uin.as_ref()).await?;
        Ok(entry
            .as_ref()
            .and_then(indexed_path)
            .map(|path| path.owner().clone()))
    }

    async fn upsert_indexed(
        &self,
        owner: &UserId,
        uin: &Uin,
        fields: &ReportFields,
    ) -> Result<ReportDocument, ReportRepositoryError> {
        let path = ReportPath::for_uin(owner.clone(), uin);
        let existing = self.index_entry(uin.as_ref()).await?;
        let precondition = match &existing {
            Some(entry) => {
                if let Some(indexed) = indexed_path(entry) {
                    if indexed.owner() != owner {
                        return Err(ReportRepositoryError::conflict(format!(
                            "UIN {uin} is already registered to another user"
                        )));
                    }
                }
                match &entry.update_time {
                    Some(update_time) => json!({ "updateTime": update_time }),
                    None => json!({ "exists": true }),
                }
            }
            None => json!({ "exists": false }),
        };

        let writes = self.upsert_writes(owner, uin, fields, precondition);
        self.client.commit(writes).await?;

        let stored = self.get(&path).await?;
        Ok(stored.unwrap_or_else(|| ReportDocument::new(path, fields.clone())))
    }

    async fn delete(&self, path: &ReportPath) -> Result<bool, ReportRepositoryError> {
        let Some(report) = self.get(path).await? else {
            return Ok(false);
        };
        let uin = report
            .fields
            .uin
            .clone()
            .unwrap_or_else(|| path.report_id().to_owned());
        let mut writes = vec![json!({
            "delete": self.client.document_name(&path.to_string()),
        })];
        let entry = if is_document_key(&uin) {
            self.index_entry(&uin).await?
        } else {
            None
        };
        if let Some(entry) = entry {
            if indexed_path(&entry).as_ref() == Some(path) {
                let mut write = json!({
                    "delete": self.client.document_name(&entry.path),
                });
                if let Some(update_time) = &entry.update_time {
                    write["currentDocument"] = json!({ "updateTime": update_time });
                }
                writes.push(write);
            }
        }
        self.client.commit(writes).await?;
        Ok(true)
    }
}
