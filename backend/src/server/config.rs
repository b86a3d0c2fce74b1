//! HTTP server configuration object and helpers.

use std::net::SocketAddr;

use actix_web::cookie::{Key, SameSite};
use inspectorate::inbound::http::state::HttpState;

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) key: Key,
    pub(crate) cookie_secure: bool,
    pub(crate) same_site: SameSite,
    pub(crate) bind_addr: SocketAddr,
    pub(crate) http_state: Option<HttpState>,
}

impl ServerConfig {
    /// Construct a server configuration from the session settings and
    /// listen address.
    #[must_use]
    pub fn new(key: Key, cookie_secure: bool, same_site: SameSite, bind_addr: SocketAddr) -> Self {
        Self {
            key,
            cookie_secure,
            same_site,
            bind_addr,
            http_state: None,
        }
    }

    /// Attach handler state built from the process settings.
    ///
    /// Without it the server runs on the in-memory development store.
    #[must_use]
    pub fn with_http_state(mut self, state: HttpState) -> Self {
        self.http_state = Some(state);
        self
    }
}
