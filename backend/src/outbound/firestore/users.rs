//! User profile repository backed by the document store REST API.

use async_trait::async_trait;
use serde_json::{Value, json};

use super::client::{FirestoreClient, FirestoreError};
use super::value::{encode_fields, field_path};
use crate::domain::ports::{UserPersistenceError, UserRepository};
use crate::domain::{USERS_COLLECTION, UserId, UserProfile};

impl From<FirestoreError> for UserPersistenceError {
    fn from(error: FirestoreError) -> Self {
        match error {
            FirestoreError::Transport(message) => Self::connection(message),
            other => Self::query(other.to_string()),
        }
    }
}

/// [`UserRepository`] over `users/{uid}` documents.
#[derive(Clone)]
pub struct FirestoreUserRepository {
    client: FirestoreClient,
}

impl FirestoreUserRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UserRepository for FirestoreUserRepository {
    async fn upsert(&self, profile: &UserProfile) -> Result<(), UserPersistenceError> {
        let body = match serde_json::to_value(profile) {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(_) => {
                return Err(UserPersistenceError::query("profile did not encode as an object"));
            }
        };
        // Merge only profile fields; other keys on the user document are kept.
        let mask: Vec<String> = ["uid", "displayName", "email", "role", "photoUrl"]
            .into_iter()
            .map(field_path)
            .collect();
        let write = json!({
            "update": {
                "name": self.client.document_name(&format!("{USERS_COLLECTION}/{}", profile.id())),
                "fields": encode_fields(&body),
            },
            "updateMask": { "fieldPaths": mask },
        });
        self.client.commit(vec![write]).await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserProfile>, UserPersistenceError> {
        let Some(stored) = self
            .client
            .get(&format!("{USERS_COLLECTION}/{id}"))
            .await?
        else {
            return Ok(None);
        };
        let mut fields = stored.fields;
        fields
            .entry("uid")
            .or_insert_with(|| Value::String(id.to_string()));
        serde_json::from_value(Value::Object(fields))
            .map(Some)
            .map_err(|error| UserPersistenceError::query(format!("malformed profile {id}: {error}")))
    }
}
