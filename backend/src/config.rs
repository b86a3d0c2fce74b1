//! Process configuration loaded via OrthoConfig.
//!
//! Every field may be set through an `INSPECTORATE_*` environment variable,
//! a config file, or the command line. Unset fields fall back to the
//! accessor defaults below.

use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Deserializer};
use url::Url;

use crate::domain::AdminAllowList;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1/";
const DEFAULT_IDENTITY_BASE_URL: &str = "https://identitytoolkit.googleapis.com/";
const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Settings for the registry server.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "INSPECTORATE")]
pub struct AppSettings {
    /// Socket address to listen on.
    pub bind_addr: Option<String>,
    /// Document store REST endpoint.
    pub firestore_base_url: Option<String>,
    /// Document store project; without it the server runs on an in-memory
    /// store.
    pub project_id: Option<String>,
    /// File holding an OAuth access token with elevated privileges.
    pub firestore_token_file: Option<PathBuf>,
    /// Public API key for reads and password sign-in.
    pub api_key: Option<String>,
    /// Identity service REST endpoint.
    pub identity_base_url: Option<String>,
    /// Directory for the local fallback report file.
    pub data_dir: Option<PathBuf>,
    /// Write reports to the local fallback file when no elevated
    /// credentials are available. Enabled unless set to false.
    pub local_fallback: Option<bool>,
    /// Emails that always sign in as Admin. The environment variable takes a
    /// comma-separated list.
    #[serde(default, deserialize_with = "email_list")]
    pub admin_emails: Option<Vec<String>>,
    /// File holding the shared secret for `POST /set-admin-claim`.
    pub admin_secret_file: Option<PathBuf>,
    /// Outbound HTTP request timeout in seconds.
    pub http_timeout_secs: Option<u64>,
}

impl AppSettings {
    /// # Errors
    ///
    /// Returns an error when the configured address is not a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, AddrParseError> {
        self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR).parse()
    }

    /// # Errors
    ///
    /// Returns an error when the configured URL does not parse.
    pub fn firestore_base_url(&self) -> Result<Url, url::ParseError> {
        base_url(self.firestore_base_url.as_deref(), DEFAULT_FIRESTORE_BASE_URL)
    }

    /// # Errors
    ///
    /// Returns an error when the configured URL does not parse.
    pub fn identity_base_url(&self) -> Result<Url, url::ParseError> {
        base_url(self.identity_base_url.as_deref(), DEFAULT_IDENTITY_BASE_URL)
    }

    /// Project id, ignoring blank values.
    pub fn project_id(&self) -> Option<&str> {
        non_blank(self.project_id.as_deref())
    }

    /// API key, ignoring blank values.
    pub fn api_key(&self) -> Option<&str> {
        non_blank(self.api_key.as_deref())
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
    }

    pub fn local_fallback(&self) -> bool {
        self.local_fallback.unwrap_or(true)
    }

    pub fn admin_allow_list(&self) -> AdminAllowList {
        self.admin_emails
            .as_deref()
            .map(AdminAllowList::from_entries)
            .unwrap_or_default()
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS))
    }
}

/// A single email arrives as a string, several as a sequence; a string may
/// still carry commas when it comes from a config file.
fn email_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(
        Option::<OneOrMany>::deserialize(deserializer)?.map(|emails| match emails {
            OneOrMany::One(raw) => raw.split(',').map(|entry| entry.trim().to_owned()).collect(),
            OneOrMany::Many(list) => list,
        }),
    )
}

fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|value| !value.is_empty())
}

/// Parse a base URL, adding the trailing slash `Url::join` needs to keep the
/// last path segment.
fn base_url(raw: Option<&str>, default: &str) -> Result<Url, url::ParseError> {
    let raw = non_blank(raw).unwrap_or(default);
    if raw.ends_with('/') {
        Url::parse(raw)
    } else {
        Url::parse(&format!("{raw}/"))
    }
}
