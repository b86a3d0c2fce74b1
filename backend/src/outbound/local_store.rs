//! JSON file fallback store used when no elevated credentials are available.
//!
//! Layout of `{data_dir}/reports.json`:
//!
//! ```json
//! { "users": { "<uid>": { "testReports": { "<uin>": { ...fields } } } } }
//! ```
//!
//! Every write reads the whole file, merges the incoming fields over the
//! stored ones and writes the file back through a temporary sibling and a
//! rename. File access runs on the blocking thread pool; writers in this
//! process are serialised by a mutex and there is no cross-process locking.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cap_std::{ambient_authority, fs::Dir};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::domain::ports::{FallbackReportStore, FallbackStoreError};
use crate::domain::{REPORTS_COLLECTION, ReportFields, Uin, UserId};

/// File name of the fallback store inside the data directory.
pub const FALLBACK_FILE: &str = "reports.json";
const FALLBACK_TMP_FILE: &str = "reports.json.tmp";

#[derive(Debug, Default, Serialize, Deserialize)]
struct FallbackFile {
    #[serde(default)]
    users: BTreeMap<String, OwnerReports>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct OwnerReports {
    #[serde(default, rename = "testReports")]
    test_reports: BTreeMap<String, Map<String, Value>>,
}

/// File-backed [`FallbackReportStore`].
pub struct JsonFileReportStore {
    dir: Arc<Mutex<Dir>>,
    location: PathBuf,
    clock: Arc<dyn Clock>,
}

impl JsonFileReportStore {
    /// Open (creating if needed) `data_dir` and use its `reports.json`.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be created or opened.
    pub fn open(data_dir: &Path, clock: Arc<dyn Clock>) -> io::Result<Self> {
        Dir::create_ambient_dir_all(data_dir, ambient_authority())?;
        let dir = Dir::open_ambient_dir(data_dir, ambient_authority())?;
        Ok(Self {
            dir: Arc::new(Mutex::new(dir)),
            location: data_dir.join(FALLBACK_FILE),
            clock,
        })
    }

    /// Path of the backing file.
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Run `op` against the locked directory on the blocking thread pool.
    async fn with_dir<T, F>(&self, op: F) -> Result<T, FallbackStoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Dir) -> Result<T, FallbackStoreError> + Send + 'static,
    {
        let dir = Arc::clone(&self.dir);
        tokio::task::spawn_blocking(move || {
            let dir = dir
                .lock()
                .map_err(|_| FallbackStoreError::io("fallback store lock poisoned"))?;
            op(&dir)
        })
        .await
        .map_err(|error| FallbackStoreError::io(format!("fallback store task failed: {error}")))?
    }
}

fn read_file(dir: &Dir) -> Result<FallbackFile, FallbackStoreError> {
    let raw = match dir.read_to_string(FALLBACK_FILE) {
        Ok(raw) => raw,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(FallbackFile::default()),
        Err(error) => return Err(FallbackStoreError::io(error.to_string())),
    };
    if raw.trim().is_empty() {
        return Ok(FallbackFile::default());
    }
    serde_json::from_str(&raw).map_err(|error| FallbackStoreError::corrupt(error.to_string()))
}

fn write_file(dir: &Dir, file: &FallbackFile) -> Result<(), FallbackStoreError> {
    let encoded = serde_json::to_vec_pretty(file)
        .map_err(|error| FallbackStoreError::corrupt(error.to_string()))?;
    dir.write(FALLBACK_TMP_FILE, encoded)
        .and_then(|()| dir.rename(FALLBACK_TMP_FILE, dir, FALLBACK_FILE))
        .map_err(|error| FallbackStoreError::io(error.to_string()))
}

#[async_trait]
impl FallbackReportStore for JsonFileReportStore {
    async fn upsert(
        &self,
        owner: &UserId,
        uin: &Uin,
        fields: &ReportFields,
    ) -> Result<(), FallbackStoreError> {
        let stamped = ReportFields {
            created_at: Some(self.clock.utc()),
            ..fields.clone()
        };
        let incoming = stamped.to_map();
        let (owner_key, uin_key) = (owner.to_string(), uin.to_string());
        self.with_dir(move |dir| {
            let mut file = read_file(dir)?;
            file.users
                .entry(owner_key)
                .or_default()
                .test_reports
                .entry(uin_key)
                .or_default()
                .extend(incoming);
            write_file(dir, &file)
        })
        .await?;
        debug!(
            location = %self.location.display(),
            collection = REPORTS_COLLECTION,
            owner = %owner,
            uin = %uin,
            "fallback report written"
        );
        Ok(())
    }

    async fn get(
        &self,
        owner: &UserId,
        uin: &Uin,
    ) -> Result<Option<ReportFields>, FallbackStoreError> {
        let file = self.with_dir(read_file).await?;
        Ok(file
            .users
            .get(owner.as_ref())
            .and_then(|reports| reports.test_reports.get(uin.as_ref()))
            .map(|stored| ReportFields::from_stored(stored.clone())))
    }
}
