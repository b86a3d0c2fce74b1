//! Port for the external identity provider that verifies passwords.
//!
//! Inbound adapters never talk to the provider directly; the account service
//! calls this port and turns the returned [`Identity`] into a session.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::domain::{DisplayName, Identity, LoginCredentials, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by identity provider adapters.
    pub enum IdentityError {
        /// Email/password pair was not accepted.
        InvalidCredentials { message: String } => "invalid credentials: {message}",
        /// The provider could not be reached.
        Connection { message: String } => "identity provider connection failed: {message}",
        /// The provider answered with something unexpected.
        Protocol { message: String } => "identity provider protocol error: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verify credentials and return the asserted identity.
    async fn sign_in(&self, credentials: &LoginCredentials) -> Result<Identity, IdentityError>;
}

/// Password accepted by [`FixtureIdentityProvider`] for every address.
pub const FIXTURE_PASSWORD: &str = "password";

/// Development provider used when no identity API key is configured.
///
/// Any well-formed email signs in with [`FIXTURE_PASSWORD`]. The uid is a
/// stable digest of the email so repeated logins map to the same profile.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureIdentityProvider;

impl FixtureIdentityProvider {
    /// Uid the fixture assigns to `email`.
    pub fn uid_for(email: &str) -> Result<UserId, IdentityError> {
        let digest = Sha256::digest(email.as_bytes());
        let short = hex::encode(&digest[..14]);
        UserId::new(short).map_err(|err| IdentityError::protocol(err.to_string()))
    }
}

#[async_trait]
impl IdentityProvider for FixtureIdentityProvider {
    async fn sign_in(&self, credentials: &LoginCredentials) -> Result<Identity, IdentityError> {
        if credentials.password() != FIXTURE_PASSWORD {
            return Err(IdentityError::invalid_credentials("password mismatch"));
        }
        let email = credentials.email().clone();
        Ok(Identity {
            uid: Self::uid_for(email.as_ref())?,
            display_name: DisplayName::new(email.local_part()).ok(),
            email,
            photo_url: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[tokio::test]
    async fn fixture_accepts_the_fixture_password() {
        let creds = LoginCredentials::try_from_parts("clerk@rei.gov.in", FIXTURE_PASSWORD)
            .expect("credentials");
        let identity = FixtureIdentityProvider
            .sign_in(&creds)
            .await
            .expect("signed in");
        assert_eq!(identity.email.as_ref(), "clerk@rei.gov.in");
        assert_eq!(
            identity.display_name.as_ref().map(AsRef::as_ref),
            Some("clerk")
        );
        assert_eq!(identity.uid.as_ref().len(), 28);
    }

    #[rstest]
    #[tokio::test]
    async fn fixture_rejects_other_passwords() {
        let creds = LoginCredentials::try_from_parts("clerk@rei.gov.in", "letmein")
            .expect("credentials");
        let err = FixtureIdentityProvider
            .sign_in(&creds)
            .await
            .expect_err("rejected");
        assert!(matches!(err, IdentityError::InvalidCredentials { .. }));
    }

    #[rstest]
    fn fixture_uid_is_stable_per_email() {
        let first = FixtureIdentityProvider::uid_for("a@b.in").expect("uid");
        let second = FixtureIdentityProvider::uid_for("a@b.in").expect("uid");
        let other = FixtureIdentityProvider::uid_for("c@b.in").expect("uid");
        assert_eq!(first, second);
        assert_ne!(first, other);
    }
}
