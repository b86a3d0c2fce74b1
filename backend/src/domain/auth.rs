//! Login credentials and the authenticated identity returned by providers.
//!
//! Inbound adapters validate raw strings through these constructors before
//! talking to the identity provider port.

use std::fmt;

use zeroize::Zeroizing;

use super::{DisplayName, Email, UserId};

/// Login payload values that failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginValidationError {
    /// Email was missing, blank, or lacked an `@`.
    InvalidEmail,
    /// Password was blank.
    EmptyPassword,
}

impl fmt::Display for LoginValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEmail => write!(f, "email must be a valid address"),
            Self::EmptyPassword => write!(f, "password must not be empty"),
        }
    }
}

impl std::error::Error for LoginValidationError {}

/// Validated email/password credentials.
///
/// The password keeps caller-provided whitespace and is zeroized on drop.
///
/// # Examples
/// ```
/// use inspectorate::domain::LoginCredentials;
///
/// let creds = LoginCredentials::try_from_parts(" Staff@Example.org ", "hunter2").unwrap();
/// assert_eq!(creds.email().as_ref(), "staff@example.org");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    email: Email,
    password: Zeroizing<String>,
}

impl LoginCredentials {
    /// Construct credentials from raw inputs.
    pub fn try_from_parts(email: &str, password: &str) -> Result<Self, LoginValidationError> {
        let email = Email::new(email).map_err(|_| LoginValidationError::InvalidEmail)?;
        if password.is_empty() {
            return Err(LoginValidationError::EmptyPassword);
        }
        Ok(Self {
            email,
            password: Zeroizing::new(password.to_owned()),
        })
    }

    /// Normalised email address.
    pub fn email(&self) -> &Email {
        &self.email
    }

    /// Password provided by the caller.
    pub fn password(&self) -> &str {
        self.password.as_str()
    }
}

/// Identity asserted by the identity provider after a successful sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Provider-assigned user id.
    pub uid: UserId,
    /// Verified email address.
    pub email: Email,
    /// Display name known to the provider, if any.
    pub display_name: Option<DisplayName>,
    /// Avatar reference known to the provider, if any.
    pub photo_url: Option<String>,
}
