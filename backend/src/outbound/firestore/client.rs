//! Thin reqwest client for the document store REST API.
//!
//! Owns transport concerns only: URL construction, authentication, timeouts,
//! status mapping and response decoding. Repository adapters build on it.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::debug;
use zeroize::Zeroizing;

use super::value::decode_fields;
use crate::outbound::body_preview;

/// How requests authenticate.
#[derive(Clone)]
pub enum FirestoreAuth {
    /// OAuth access token carrying elevated (service) credentials.
    Bearer(Zeroizing<String>),
    /// Public API key; reads only, subject to security rules.
    ApiKey(String),
}

impl FirestoreAuth {
    pub fn is_elevated(&self) -> bool {
        matches!(self, Self::Bearer(_))
    }
}

impl std::fmt::Debug for FirestoreAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bearer(_) => f.write_str("Bearer(<redacted>)"),
            Self::ApiKey(_) => f.write_str("ApiKey(<redacted>)"),
        }
    }
}

/// Transport-level failures, mapped onto port errors by each adapter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FirestoreError {
    #[error("transport failed: {0}")]
    Transport(String),
    #[error("credentials rejected (status {status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("precondition failed: {0}")]
    Precondition(String),
    #[error("status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed response: {0}")]
    Decode(String),
}

/// A stored document as returned by the REST API, fields already decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    /// Path relative to the database root, e.g. `users/u1/testReports/REI-1`.
    pub path: String,
    pub fields: Map<String, Value>,
    pub update_time: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
    #[serde(default)]
    update_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RunQueryRow {
    #[serde(default)]
    document: Option<RawDocument>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListPage {
    #[serde(default)]
    documents: Vec<RawDocument>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Page size used when listing collections.
const LIST_PAGE_SIZE: usize = 300;

/// REST client bound to one project's default database.
#[derive(Clone)]
pub struct FirestoreClient {
    client: Client,
    base_url: Url,
    database: String,
    auth: FirestoreAuth,
}

impl FirestoreClient {
    /// Build a client with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(
        base_url: Url,
        project_id: &str,
        auth: FirestoreAuth,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            database: format!("projects/{project_id}/databases/(default)"),
            auth,
        })
    }

    pub fn auth(&self) -> &FirestoreAuth {
        &self.auth
    }

    /// Full resource name of a document path.
    pub fn document_name(&self, path: &str) -> String {
        format!("{}/documents/{path}", self.database)
    }

    /// URL of a database-level method such as `:runQuery`.
    fn url(&self, suffix: &str) -> Result<Url, FirestoreError> {
        self.base_url
            .join(&format!("{}/documents{suffix}", self.database))
            .map_err(|error| FirestoreError::Transport(format!("invalid request URL: {error}")))
    }

    /// URL of a document or collection path. Each `/`-separated segment is
    /// percent-encoded on its own, so ids holding `?`, `#`, `%` or spaces
    /// address the document they name.
    fn document_url(&self, path: &str) -> Result<Url, FirestoreError> {
        let mut url = self.url("")?;
        url.path_segments_mut()
            .map_err(|()| FirestoreError::Transport("base URL cannot carry a path".to_owned()))?
            .extend(path.split('/'));
        Ok(url)
    }

    fn authorise(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            FirestoreAuth::Bearer(token) => request.bearer_auth(token.as_str()),
            FirestoreAuth::ApiKey(key) => request.query(&[("key", key.as_str())]),
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Option<Value>, FirestoreError> {
        let response = self
            .authorise(request)
            .send()
            .await
            .map_err(map_transport_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        serde_json::from_slice(body.as_ref())
            .map(Some)
            .map_err(|error| FirestoreError::Decode(error.to_string()))
    }

    /// Read one document; `Ok(None)` when it does not exist.
    pub async fn get(&self, path: &str) -> Result<Option<StoredDocument>, FirestoreError> {
        let url = self.document_url(path)?;
        match self.send(self.client.get(url)).await? {
            Some(body) => self.decode_document(body).map(Some),
            None => Ok(None),
        }
    }

    /// Collection-group equality query across every `collection_id`
    /// sub-collection.
    pub async fn query_collection_group(
        &self,
        collection_id: &str,
        field: &str,
        value: Value,
    ) -> Result<Vec<StoredDocument>, FirestoreError> {
        let body = json!({
            "structuredQuery": {
                "from": [{ "collectionId": collection_id, "allDescendants": true }],
                "where": {
                    "fieldFilter": {
                        "field": { "fieldPath": field },
                        "op": "EQUAL",
                        "value": value,
                    }
                }
            }
        });
        let url = self.url(":runQuery")?;
        let rows: Vec<RunQueryRow> = match self.send(self.client.post(url).json(&body)).await? {
            Some(payload) => serde_json::from_value(payload)
                .map_err(|error| FirestoreError::Decode(error.to_string()))?,
            None => Vec::new(),
        };
        rows.into_iter()
            .filter_map(|row| row.document)
            .map(|raw| self.decode_raw(raw))
            .collect()
    }

    /// Up to `limit` document ids of a top-level collection, in key order,
    /// including missing documents that only parent sub-collections.
    pub async fn list_ids(
        &self,
        collection: &str,
        limit: usize,
    ) -> Result<Vec<String>, FirestoreError> {
        let mut ids = Vec::new();
        let mut page_token: Option<String> = None;
        while ids.len() < limit {
            let page_size = LIST_PAGE_SIZE.min(limit - ids.len()).to_string();
            let url = self.document_url(collection)?;
            let mut request = self.client.get(url).query(&[
                ("pageSize", page_size.as_str()),
                ("showMissing", "true"),
                ("mask.fieldPaths", "__name__"),
            ]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }
            let Some(payload) = self.send(request).await? else {
                break;
            };
            let page: ListPage = serde_json::from_value(payload)
                .map_err(|error| FirestoreError::Decode(error.to_string()))?;
            ids.extend(
                page.documents
                    .iter()
                    .filter_map(|document| document.name.rsplit('/').next())
                    .map(str::to_owned),
            );
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        ids.truncate(limit);
        debug!(collection, count = ids.len(), "listed document ids");
        Ok(ids)
    }

    /// Every document of a collection path, in key order.
    pub async fn list_documents(
        &self,
        collection_path: &str,
    ) -> Result<Vec<StoredDocument>, FirestoreError> {
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let url = self.document_url(collection_path)?;
            let page_size = LIST_PAGE_SIZE.to_string();
            let mut request = self
                .client
                .get(url)
                .query(&[("pageSize", page_size.as_str())]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }
            let Some(payload) = self.send(request).await? else {
                break;
            };
            let page: ListPage = serde_json::from_value(payload)
                .map_err(|error| FirestoreError::Decode(error.to_string()))?;
            for raw in page.documents {
                documents.push(self.decode_raw(raw)?);
            }
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        Ok(documents)
    }

    /// Apply `writes` atomically.
    pub async fn commit(&self, writes: Vec<Value>) -> Result<(), FirestoreError> {
        let url = self.url(":commit")?;
        let body = json!({ "writes": writes });
        match self.send(self.client.post(url).json(&body)).await? {
            Some(_) => Ok(()),
            None => Err(FirestoreError::Precondition(
                "a document named in the commit does not exist".to_owned(),
            )),
        }
    }

    /// Cheap authenticated read used at startup to confirm the credentials.
    pub async fn probe(&self) -> Result<(), FirestoreError> {
        self.list_ids("users", 1).await.map(|_| ())
    }

    fn decode_document(&self, body: Value) -> Result<StoredDocument, FirestoreError> {
        let raw: RawDocument =
            serde_json::from_value(body).map_err(|error| FirestoreError::Decode(error.to_string()))?;
        self.decode_raw(raw)
    }

    fn decode_raw(&self, raw: RawDocument) -> Result<StoredDocument, FirestoreError> {
        let prefix = format!("{}/documents/", self.database);
        let path = raw
            .name
            .strip_prefix(&prefix)
            .ok_or_else(|| {
                FirestoreError::Decode(format!("document outside database: {}", raw.name))
            })?
            .to_owned();
        let fields = decode_fields(&raw.fields).map_err(FirestoreError::Decode)?;
        Ok(StoredDocument {
            path,
            fields,
            update_time: raw.update_time,
        })
    }
}

fn map_transport_error(error: reqwest::Error) -> FirestoreError {
    if error.is_timeout() {
        FirestoreError::Transport(format!("request timed out: {error}"))
    } else {
        FirestoreError::Transport(error.to_string())
    }
}

pub(crate) fn map_status_error(status: StatusCode, body: &[u8]) -> FirestoreError {
    let preview = body_preview(body);
    let message = if preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        preview
    };
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FirestoreError::Rejected {
            status: status.as_u16(),
            message,
        },
        StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => {
            FirestoreError::Precondition(message)
        }
        StatusCode::BAD_REQUEST if message.contains("FAILED_PRECONDITION") => {
            FirestoreError::Precondition(message)
        }
        _ => FirestoreError::Status {
            status: status.as_u16(),
            message,
        },
    }
}
