//! Reqwest-backed [`UinLookup`] calling a running server's `check-uin`
//! endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;

use crate::domain::ports::{UinLookup, UinLookupError};
use crate::outbound::body_preview;

#[derive(Debug, Deserialize)]
struct CheckUinResponseDto {
    exists: bool,
}

/// Lookup adapter bound to one server base URL.
pub struct HttpUinLookup {
    client: Client,
    endpoint: Url,
}

impl HttpUinLookup {
    /// # Errors
    ///
    /// Returns an error when `base_url` cannot be extended with the endpoint
    /// path or the reqwest client cannot be constructed.
    pub fn new(base_url: &Url, timeout: Duration) -> Result<Self, std::io::Error> {
        let endpoint = base_url
            .join("check-uin")
            .map_err(|error| std::io::Error::other(error.to_string()))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(std::io::Error::other)?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl UinLookup for HttpUinLookup {
    async fn exists(&self, uin: &str) -> Result<bool, UinLookupError> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[("uin", uin)])
            .send()
            .await
            .map_err(map_transport_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        parse_exists(body.as_ref())
    }
}

fn parse_exists(body: &[u8]) -> Result<bool, UinLookupError> {
    serde_json::from_slice::<CheckUinResponseDto>(body)
        .map(|decoded| decoded.exists)
        .map_err(|error| UinLookupError::decode(format!("invalid check-uin payload: {error}")))
}

fn map_transport_error(error: reqwest::Error) -> UinLookupError {
    if error.is_timeout() {
        UinLookupError::transport(format!("timed out: {error}"))
    } else {
        UinLookupError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> UinLookupError {
    UinLookupError::status(status.as_u16(), body_preview(body))
}
