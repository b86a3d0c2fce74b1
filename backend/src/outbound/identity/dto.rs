//! DTOs for the identity service's account endpoints.

use serde::{Deserialize, Serialize};

use crate::domain::{DisplayName, Email, Identity, UserId};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SignInRequestDto<'a> {
    pub(super) email: &'a str,
    pub(super) password: &'a str,
    pub(super) return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SignInResponseDto {
    pub(super) local_id: String,
    pub(super) email: String,
    #[serde(default)]
    pub(super) display_name: Option<String>,
    #[serde(default, rename = "profilePicture")]
    pub(super) photo_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct UpdateAccountDto<'a> {
    pub(super) local_id: &'a str,
    /// JSON-encoded claims object, as the endpoint expects a string.
    pub(super) custom_attributes: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct ErrorEnvelopeDto {
    pub(super) error: ErrorDto,
}

#[derive(Debug, Deserialize)]
pub(super) struct ErrorDto {
    #[serde(default)]
    pub(super) message: String,
}

impl SignInResponseDto {
    pub(super) fn into_identity(self) -> Result<Identity, String> {
        let uid = UserId::new(self.local_id).map_err(|error| format!("localId: {error}"))?;
        let email = Email::new(&self.email).map_err(|error| format!("email: {error}"))?;
        // Providers return empty strings for unset names; fall back to none.
        let display_name = self
            .display_name
            .as_deref()
            .and_then(|name| DisplayName::new(name).ok());
        let photo_url = self.photo_url.filter(|url| !url.trim().is_empty());
        Ok(Identity {
            uid,
            email,
            display_name,
            photo_url,
        })
    }
}
