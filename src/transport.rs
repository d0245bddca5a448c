//! HTTP transport seam.
//!
//! The gateway hands a fully built request to an [`HttpTransport`] and gets
//! back the status and raw body. Anything that prevents a response from
//! arriving (DNS, refused connection, timeout, broken body stream) is a
//! [`TransportError`]; HTTP error statuses are ordinary responses here.

use std::time::Duration;

use reqwest::Method;
use reqwest::header::HeaderMap;

use crate::config::Timeouts;

/// Failures below the HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The request could not be sent or the response not received.
    #[error("request failed: {0}")]
    Request(String),

    /// The request exceeded the configured timeout.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    ClientBuild(String),
}

/// One outbound call with headers already merged and body already encoded.
#[derive(Debug, Clone)]
pub struct OutgoingRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

/// Raw status and body as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Sends one request. Enables mocking in tests.
#[async_trait::async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send `request` and wait for the full response.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if no HTTP response was obtained.
    async fn send(&self, request: OutgoingRequest) -> Result<TransportResponse, TransportError>;
}

// =============================================================================
// REQWEST
// =============================================================================

pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a client with the given timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ClientBuild`] if the TLS backend fails to
    /// initialize.
    pub fn new(timeouts: Timeouts) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| TransportError::ClientBuild(e.to_string()))?;
        Ok(Self { http })
    }
}

#[async_trait::async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: OutgoingRequest) -> Result<TransportResponse, TransportError> {
        let builder = self
            .http
            .request(request.method, &request.url)
            .headers(request.headers);
        let builder = match request.body {
            Some(body) => builder.body(body),
            None => builder,
        };

        let response = builder.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify)?;
        Ok(TransportResponse { status, body })
    }
}

fn classify(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout(e.to_string())
    } else {
        TransportError::Request(e.to_string())
    }
}
