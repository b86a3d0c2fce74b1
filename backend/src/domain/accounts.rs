//! Account use-cases: login, profile lookup and admin promotion.
//!
//! The profile `role` is authoritative. The credential claim is derived from
//! it on every login and after every promotion, so a failed claim update is
//! repaired by simply running the derivation again.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::domain::ports::{
    ClaimsError, ClaimsGateway, IdentityError, IdentityProvider, UserPersistenceError,
    UserRepository,
};
use crate::domain::user::DISPLAY_NAME_MAX;
use crate::domain::{
    DisplayName, Email, Error, Identity, LoginCredentials, Role, UserId, UserProfile,
};

/// Attempts made to derive a claim during [`AccountService::grant_admin`].
pub const CLAIM_ATTEMPTS: u32 = 3;

const CLAIM_RETRY_DELAY: Duration = Duration::from_millis(200);

/// Emails whose accounts are bootstrapped as administrators.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminAllowList(BTreeSet<Email>);

impl AdminAllowList {
    /// Parse a comma-separated list; malformed entries are skipped.
    ///
    /// # Examples
    /// ```
    /// use inspectorate::domain::{AdminAllowList, Email};
    ///
    /// let admins = AdminAllowList::parse("chief@rei.gov.in, ,bogus");
    /// assert!(admins.contains(&Email::new("CHIEF@rei.gov.in").unwrap()));
    /// assert_eq!(admins.len(), 1);
    /// ```
    pub fn parse(raw: &str) -> Self {
        Self::from_entries(raw.split(','))
    }

    /// Build the list from individual entries; malformed entries are skipped.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        Self(
            entries
                .into_iter()
                .filter_map(|entry| Email::new(entry.as_ref()).ok())
                .collect(),
        )
    }

    pub fn contains(&self, email: &Email) -> bool {
        self.0.contains(email)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Result of a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    pub profile: UserProfile,
    /// Whether the credential claim now matches the profile role.
    pub claim_synced: bool,
}

/// Account service orchestrating the identity provider, profile store and
/// claims gateway.
#[derive(Clone)]
pub struct AccountService {
    identity: Arc<dyn IdentityProvider>,
    users: Arc<dyn UserRepository>,
    claims: Arc<dyn ClaimsGateway>,
    admins: AdminAllowList,
}

impl AccountService {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        users: Arc<dyn UserRepository>,
        claims: Arc<dyn ClaimsGateway>,
        admins: AdminAllowList,
    ) -> Self {
        Self {
            identity,
            users,
            claims,
            admins,
        }
    }

    /// Authenticate and bring the profile and claim up to date.
    ///
    /// A claim failure does not fail the login; the next login retries it.
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<LoginOutcome, Error> {
        let identity = self
            .identity
            .sign_in(credentials)
            .await
            .map_err(identity_error)?;
        let profile = self.reconcile_profile(&identity).await?;

        let claim_synced = match self
            .claims
            .set_role_claim(profile.id(), profile.role())
            .await
        {
            Ok(()) => true,
            Err(error) => {
                warn!(
                    uid = %profile.id(),
                    role = %profile.role(),
                    error = %error,
                    "claim derivation failed; will retry on next login"
                );
                false
            }
        };
        info!(uid = %profile.id(), role = %profile.role(), "user logged in");
        Ok(LoginOutcome {
            profile,
            claim_synced,
        })
    }

    /// Stored profile for `uid`.
    pub async fn profile(&self, uid: &UserId) -> Result<UserProfile, Error> {
        self.users
            .find_by_id(uid)
            .await
            .map_err(persistence_error)?
            .ok_or_else(|| Error::not_found(format!("user {uid} not found")))
    }

    /// Promote `uid` to Admin: profile first, then the derived claim.
    ///
    /// Re-invoking after a claim failure is safe and completes the repair.
    pub async fn grant_admin(&self, uid: &UserId) -> Result<UserProfile, Error> {
        let profile = self.profile(uid).await?;
        let profile = if profile.role().is_admin() {
            profile
        } else {
            let promoted = profile.with_role(Role::Admin);
            self.users
                .upsert(&promoted)
                .await
                .map_err(persistence_error)?;
            promoted
        };

        let mut last_error = None;
        for attempt in 1..=CLAIM_ATTEMPTS {
            match self.claims.set_role_claim(uid, Role::Admin).await {
                Ok(()) => {
                    info!(uid = %uid, attempt, "admin claim granted");
                    return Ok(profile);
                }
                Err(error @ ClaimsError::Unavailable { .. }) => {
                    warn!(uid = %uid, error = %error, "claims service not configured");
                    return Err(claims_error(Some(error)));
                }
                Err(error) => {
                    warn!(uid = %uid, attempt, error = %error, "admin claim update failed");
                    last_error = Some(error);
                    if attempt < CLAIM_ATTEMPTS {
                        tokio::time::sleep(CLAIM_RETRY_DELAY * attempt).await;
                    }
                }
            }
        }
        Err(claims_error(last_error))
    }

    async fn reconcile_profile(&self, identity: &Identity) -> Result<UserProfile, Error> {
        let allow_listed = self.admins.contains(&identity.email);
        let existing = self
            .users
            .find_by_id(&identity.uid)
            .await
            .map_err(persistence_error)?;

        let profile = match existing {
            Some(profile) if allow_listed && !profile.role().is_admin() => {
                info!(uid = %identity.uid, "elevating allow-listed account");
                profile.with_role(Role::Admin)
            }
            Some(profile) => return Ok(profile),
            None => {
                let role = if allow_listed { Role::Admin } else { Role::Staff };
                info!(uid = %identity.uid, role = %role, "creating profile on first login");
                UserProfile::new(
                    identity.uid.clone(),
                    display_name_for(identity)?,
                    identity.email.clone(),
                    role,
                )
                .with_photo_url(identity.photo_url.clone())
            }
        };
        self.users
            .upsert(&profile)
            .await
            .map_err(persistence_error)?;
        Ok(profile)
    }
}

fn display_name_for(identity: &Identity) -> Result<DisplayName, Error> {
    if let Some(name) = &identity.display_name {
        return Ok(name.clone());
    }
    let local: String = identity
        .email
        .local_part()
        .chars()
        .take(DISPLAY_NAME_MAX)
        .collect();
    DisplayName::new(local).map_err(|err| Error::internal(format!("no usable display name: {err}")))
}

fn identity_error(error: IdentityError) -> Error {
    match error {
        IdentityError::InvalidCredentials { .. } => Error::unauthorized("invalid credentials"),
        other => Error::service(other.to_string()),
    }
}

fn persistence_error(error: UserPersistenceError) -> Error {
    Error::service(error.to_string())
}

fn claims_error(error: Option<ClaimsError>) -> Error {
    match error {
        Some(ClaimsError::Unavailable { message }) => Error::not_implemented(message),
        Some(other) => Error::service(format!(
            "profile updated but claim derivation failed; retry to repair: {other}"
        )),
        None => Error::internal("claim derivation did not run"),
    }
}

#[cfg(test)]
#[path = "accounts_tests.rs"]
mod tests;
