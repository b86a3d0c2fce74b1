//! Port used by the client-side uniqueness checker to ask whether a UIN is
//! already taken.

use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Errors raised while asking the lookup service.
    pub enum UinLookupError {
        /// The service could not be reached or timed out.
        Transport { message: String } => "uin lookup transport failed: {message}",
        /// The service answered with an error status.
        Status { status: u16, message: String } => "uin lookup returned {status}: {message}",
        /// The response body could not be decoded.
        Decode { message: String } => "uin lookup response malformed: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UinLookup: Send + Sync {
    /// Whether any stored report carries `uin`.
    async fn exists(&self, uin: &str) -> Result<bool, UinLookupError>;
}
