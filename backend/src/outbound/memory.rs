//! In-memory document store.
//!
//! Mirrors the hierarchical layout of the real store (`users/{uid}` profiles
//! with `testReports` sub-collections plus the `uinIndex` collection) so the
//! server runs without credentials in development and handler tests exercise
//! real lookup behaviour.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use mockable::Clock;

use crate::domain::ports::{
    ClaimsError, ClaimsGateway, ReportRepository, ReportRepositoryError, UserPersistenceError,
    UserRepository,
};
use crate::domain::{ReportDocument, ReportFields, ReportPath, Role, Uin, UserId, UserProfile};

#[derive(Default)]
struct Collections {
    profiles: BTreeMap<UserId, UserProfile>,
    reports: BTreeMap<ReportPath, ReportFields>,
    uin_index: BTreeMap<String, ReportPath>,
}

/// Shared in-memory store implementing the report and user ports.
#[derive(Clone)]
pub struct InMemoryDocumentStore {
    collections: Arc<Mutex<Collections>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryDocumentStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            collections: Arc::new(Mutex::new(Collections::default())),
            clock,
        }
    }

    /// Insert a report verbatim, bypassing the UIN index, the way records
    /// written by older tooling appear.
    pub fn seed_report(&self, path: ReportPath, fields: ReportFields) {
        if let Ok(mut collections) = self.collections.lock() {
            collections.reports.insert(path, fields);
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Collections>, String> {
        self.collections
            .lock()
            .map_err(|_| "in-memory store lock poisoned".to_owned())
    }
}

#[async_trait]
impl ReportRepository for InMemoryDocumentStore {
    async fn find_by_uin_field(
        &self,
        uin: &str,
    ) -> Result<Vec<ReportDocument>, ReportRepositoryError> {
        let collections = self.lock().map_err(ReportRepositoryError::query)?;
        let mut hits: Vec<ReportDocument> = collections
            .reports
            .iter()
            .filter(|(_, fields)| fields.uin.as_deref() == Some(uin))
            .map(|(path, fields)| ReportDocument::new(path.clone(), fields.clone()))
            .collect();
        hits.sort_by_cached_key(|document| document.path.to_string());
        Ok(hits)
    }

    async fn list_owner_ids(&self, limit: usize) -> Result<Vec<UserId>, ReportRepositoryError> {
        let collections = self.lock().map_err(ReportRepositoryError::query)?;
        let owners: BTreeSet<&UserId> = collections
            .profiles
            .keys()
            .chain(collections.reports.keys().map(ReportPath::owner))
            .collect();
        Ok(owners.into_iter().take(limit).cloned().collect())
    }

    async fn get(&self, path: &ReportPath) -> Result<Option<ReportDocument>, ReportRepositoryError> {
        let collections = self.lock().map_err(ReportRepositoryError::query)?;
        Ok(collections
            .reports
            .get(path)
            .map(|fields| ReportDocument::new(path.clone(), fields.clone())))
    }

    async fn list_for_owner(
        &self,
        owner: &UserId,
    ) -> Result<Vec<ReportDocument>, ReportRepositoryError> {
        let collections = self.lock().map_err(ReportRepositoryError::query)?;
        Ok(collections
            .reports
            .iter()
            .filter(|(path, _)| path.owner() == owner)
            .map(|(path, fields)| ReportDocument::new(path.clone(), fields.clone()))
            .collect())
    }

    async fn indexed_owner(&self, uin: &Uin) -> Result<Option<UserId>, ReportRepositoryError> {
        let collections = self.lock().map_err(ReportRepositoryError::query)?;
        Ok(collections
            .uin_index
            .get(uin.as_ref())
            .map(|path| path.owner().clone()))
    }

    async fn upsert_indexed(
        &self,
        owner: &UserId,
        uin: &Uin,
        fields: &ReportFields,
    ) -> Result<ReportDocument, ReportRepositoryError> {
        let mut collections = self.lock().map_err(ReportRepositoryError::query)?;
        if let Some(existing) = collections.uin_index.get(uin.as_ref()) {
            if existing.owner() != owner {
                return Err(ReportRepositoryError::conflict(format!(
                    "UIN {uin} is already registered to another user"
                )));
            }
        }

        let path = ReportPath::for_uin(owner.clone(), uin);
        let stored = collections.reports.get(&path).cloned().unwrap_or_default();
        let mut merged = stored.merged_with(fields);
        merged.created_at = Some(self.clock.utc());
        collections.reports.insert(path.clone(), merged.clone());
        collections
            .uin_index
            .insert(uin.as_ref().to_owned(), path.clone());
        Ok(ReportDocument::new(path, merged))
    }

    async fn delete(&self, path: &ReportPath) -> Result<bool, ReportRepositoryError> {
        let mut collections = self.lock().map_err(ReportRepositoryError::query)?;
        let existed = collections.reports.remove(path).is_some();
        collections.uin_index.retain(|_, indexed| indexed != path);
        Ok(existed)
    }
}

#[async_trait]
impl UserRepository for InMemoryDocumentStore {
    async fn upsert(&self, profile: &UserProfile) -> Result<(), UserPersistenceError> {
        let mut collections = self.lock().map_err(UserPersistenceError::query)?;
        collections
            .profiles
            .insert(profile.id().clone(), profile.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserProfile>, UserPersistenceError> {
        let collections = self.lock().map_err(UserPersistenceError::query)?;
        Ok(collections.profiles.get(id).cloned())
    }
}

/// Claims gateway that records the last claim set per user.
#[derive(Clone, Default)]
pub struct InMemoryClaimsGateway {
    claims: Arc<Mutex<BTreeMap<UserId, Role>>>,
}

impl InMemoryClaimsGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Role the credential currently carries, if any claim was ever set.
    pub fn claim_for(&self, uid: &UserId) -> Option<Role> {
        self.claims
            .lock()
            .ok()
            .and_then(|claims| claims.get(uid).copied())
    }
}

#[async_trait]
impl ClaimsGateway for InMemoryClaimsGateway {
    async fn set_role_claim(&self, uid: &UserId, role: Role) -> Result<(), ClaimsError> {
        let mut claims = self
            .claims
            .lock()
            .map_err(|_| ClaimsError::connection("in-memory claims lock poisoned"))?;
        claims.insert(uid.clone(), role);
        Ok(())
    }
}
