//! Shared HTTP adapter state.
//!
//! Handlers receive this through `web::Data` and only ever talk to domain
//! services, so tests can assemble it from in-memory adapters.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::domain::{AccountService, ReportLocator, ReportWriter};

/// SHA-256 digest of the shared secret guarding `POST /set-admin-claim`.
///
/// Only the digest is kept in memory; candidates are hashed and compared
/// without short-circuiting.
#[derive(Clone)]
pub struct AdminSecret([u8; 32]);

impl AdminSecret {
    /// Hash `secret` after trimming surrounding whitespace. Blank secrets
    /// are treated as not configured.
    pub fn from_plaintext(secret: Zeroizing<String>) -> Option<Self> {
        let trimmed = secret.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(Sha256::digest(trimmed.as_bytes()).into()))
    }

    pub fn matches(&self, candidate: &str) -> bool {
        let digest: [u8; 32] = Sha256::digest(candidate.trim().as_bytes()).into();
        digest
            .iter()
            .zip(self.0.iter())
            .fold(0_u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl std::fmt::Debug for AdminSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AdminSecret(<redacted>)")
    }
}

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub locator: Arc<ReportLocator>,
    pub writer: Arc<ReportWriter>,
    pub accounts: Arc<AccountService>,
    /// `None` when no admin secret is configured; the secret-guarded
    /// endpoint then rejects every call.
    pub admin_secret: Option<AdminSecret>,
}

impl HttpState {
    pub fn new(
        locator: Arc<ReportLocator>,
        writer: Arc<ReportWriter>,
        accounts: Arc<AccountService>,
    ) -> Self {
        Self {
            locator,
            writer,
            accounts,
            admin_secret: None,
        }
    }

    #[must_use]
    pub fn with_admin_secret(mut self, secret: Option<AdminSecret>) -> Self {
        self.admin_secret = secret;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("s3cret", true)]
    #[case("  s3cret\n", true)]
    #[case("s3cre", false)]
    #[case("", false)]
    fn secrets_compare_by_digest(#[case] candidate: &str, #[case] expected: bool) {
        let secret =
            AdminSecret::from_plaintext(Zeroizing::new("s3cret\n".to_owned())).expect("configured");
        assert_eq!(secret.matches(candidate), expected);
    }

    #[rstest]
    fn blank_secrets_are_not_configured() {
        assert!(AdminSecret::from_plaintext(Zeroizing::new("  \n".to_owned())).is_none());
    }
}
