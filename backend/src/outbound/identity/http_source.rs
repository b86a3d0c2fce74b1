//! Reqwest-backed identity service adapters.
//!
//! Password sign-in uses the public API key; claim updates need an elevated
//! bearer token and are only wired up when the privileged path is available.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde_json::json;
use zeroize::Zeroizing;

use super::dto::{ErrorEnvelopeDto, SignInRequestDto, SignInResponseDto, UpdateAccountDto};
use crate::domain::ports::{ClaimsError, ClaimsGateway, IdentityError, IdentityProvider};
use crate::domain::{Identity, LoginCredentials, Role, UserId};
use crate::outbound::body_preview;

/// Messages the sign-in endpoint uses for a wrong email/password pair.
const CREDENTIAL_FAILURES: [&str; 5] = [
    "EMAIL_NOT_FOUND",
    "INVALID_PASSWORD",
    "INVALID_LOGIN_CREDENTIALS",
    "INVALID_EMAIL",
    "USER_DISABLED",
];

/// [`IdentityProvider`] calling `accounts:signInWithPassword`.
pub struct IdentityToolkitProvider {
    client: Client,
    base_url: Url,
    api_key: Zeroizing<String>,
}

impl IdentityToolkitProvider {
    /// Build an adapter using a reqwest client with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(
        base_url: Url,
        api_key: Zeroizing<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }
}

#[async_trait]
impl IdentityProvider for IdentityToolkitProvider {
    async fn sign_in(&self, credentials: &LoginCredentials) -> Result<Identity, IdentityError> {
        let url = self
            .base_url
            .join("v1/accounts:signInWithPassword")
            .map_err(|error| IdentityError::protocol(format!("invalid sign-in URL: {error}")))?;
        let body = SignInRequestDto {
            email: credentials.email().as_ref(),
            password: credentials.password(),
            return_secure_token: true,
        };
        let response = self
            .client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|error| IdentityError::connection(error.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|error| IdentityError::connection(error.to_string()))?;
        if !status.is_success() {
            return Err(map_sign_in_error(status, bytes.as_ref()));
        }

        let decoded: SignInResponseDto = serde_json::from_slice(bytes.as_ref()).map_err(|error| {
            IdentityError::protocol(format!("invalid sign-in payload: {error}"))
        })?;
        decoded.into_identity().map_err(IdentityError::protocol)
    }
}

fn error_message(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<ErrorEnvelopeDto>(body)
        .ok()
        .map(|envelope| envelope.error.message)
}

fn map_sign_in_error(status: StatusCode, body: &[u8]) -> IdentityError {
    let message = error_message(body).unwrap_or_else(|| body_preview(body));
    let is_credential_failure = CREDENTIAL_FAILURES
        .iter()
        .any(|known| message.starts_with(known));
    if status == StatusCode::BAD_REQUEST && is_credential_failure {
        IdentityError::invalid_credentials(message)
    } else if status.is_server_error() {
        IdentityError::connection(format!("status {}: {message}", status.as_u16()))
    } else {
        IdentityError::protocol(format!("status {}: {message}", status.as_u16()))
    }
}

/// [`ClaimsGateway`] calling the project-scoped `accounts:update` endpoint.
pub struct IdentityToolkitClaimsGateway {
    client: Client,
    update_url: Url,
    token: Zeroizing<String>,
}

impl IdentityToolkitClaimsGateway {
    /// # Errors
    ///
    /// Returns an error when the URL cannot be built or the reqwest client
    /// cannot be constructed.
    pub fn new(
        base_url: &Url,
        project_id: &str,
        token: Zeroizing<String>,
        timeout: Duration,
    ) -> Result<Self, std::io::Error> {
        let update_url = base_url
            .join(&format!("v1/projects/{project_id}/accounts:update"))
            .map_err(|error| std::io::Error::other(error.to_string()))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(std::io::Error::other)?;
        Ok(Self {
            client,
            update_url,
            token,
        })
    }
}

/// Claims object written for `role`.
pub(super) fn claims_for(role: Role) -> String {
    json!({ "admin": role.is_admin() }).to_string()
}

#[async_trait]
impl ClaimsGateway for IdentityToolkitClaimsGateway {
    async fn set_role_claim(&self, uid: &UserId, role: Role) -> Result<(), ClaimsError> {
        let body = UpdateAccountDto {
            local_id: uid.as_ref(),
            custom_attributes: claims_for(role),
        };
        let response = self
            .client
            .post(self.update_url.clone())
            .bearer_auth(self.token.as_str())
            .json(&body)
            .send()
            .await
            .map_err(|error| ClaimsError::connection(error.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let bytes = response.bytes().await.unwrap_or_default();
        let message = error_message(bytes.as_ref()).unwrap_or_else(|| body_preview(bytes.as_ref()));
        let message = format!("status {}: {message}", status.as_u16());
        if status.is_server_error() {
            Err(ClaimsError::connection(message))
        } else {
            Err(ClaimsError::rejected(message))
        }
    }
}
