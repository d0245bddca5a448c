//! Request gateway, the single choke point for API calls.
//!
//! ARCHITECTURE
//! ============
//! Every request gets `Content-Type: application/json` by default, the
//! caller's headers, the fixed `X-Tenant` header, and `Authorization: Bearer`
//! when the session holds a token, in that precedence order. A missing token
//! is not an error: the request goes out unauthenticated, since some
//! endpoints are public.
//!
//! A 401 expires the session (memory is cleared even if storage is not) and
//! publishes [`SessionEvent::Expired`] before the failure is returned. The
//! gateway never navigates; whoever owns navigation subscribes (see
//! `navigation::watch_session_expiry`).
//!
//! ERROR HANDLING
//! ==============
//! Transport failures and HTTP error statuses are distinct [`ApiError`]
//! variants so callers can retry only the former. Unparseable bodies never
//! surface as errors: they become `{}` on success and the generic fallback
//! message on failure. Nothing here retries.

use std::collections::BTreeMap;
use std::sync::Arc;

use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde_json::{Map, Value};
use tokio::sync::broadcast;

use crate::config::StorefrontConfig;
use crate::session::SessionStore;
use crate::storage::StorageError;
use crate::transport::{HttpTransport, OutgoingRequest, TransportError};

/// Header carrying the tenant id on every request.
pub const TENANT_HEADER: &str = "x-tenant";
/// Message used when a failed response carries no `message` field.
pub const FALLBACK_ERROR_MESSAGE: &str = "API request failed";

const SESSION_EVENT_CAPACITY: usize = 16;

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by gateway calls and the services built on them.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No HTTP response was obtained.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server answered 401; the session has already been cleared.
    #[error("{message}")]
    Unauthorized { message: String },

    /// The server answered with another non-2xx status.
    #[error("{message}")]
    Http { status: u16, message: String },

    /// A caller-supplied or derived header is not a legal HTTP header.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// The request body could not be encoded.
    #[error("request body encoding failed: {0}")]
    Encode(String),

    /// A 2xx response lacked something the caller needs.
    #[error("{0}")]
    InvalidResponse(String),

    /// Session storage could not be updated.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ApiError {
    /// HTTP status for server-answered failures.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { .. } => Some(401),
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Only failures where the request never completed are worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

// =============================================================================
// REQUEST OPTIONS
// =============================================================================

/// Gateway notifications for whoever owns navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A 401 was received and the session has been cleared.
    Expired,
}

/// Request body as supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    /// Sent verbatim.
    Text(String),
    /// Serialized to a JSON string before sending.
    Json(Value),
}

#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: BTreeMap<String, String>,
    pub body: RequestBody,
}

impl RequestOptions {
    #[must_use]
    pub fn get() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn post(body: Value) -> Self {
        Self { method: Method::POST, body: RequestBody::Json(body), ..Self::default() }
    }

    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }
}

// =============================================================================
// GATEWAY
// =============================================================================

pub struct RequestGateway {
    base_url: String,
    tenant: HeaderValue,
    session: Arc<SessionStore>,
    transport: Arc<dyn HttpTransport>,
    events: broadcast::Sender<SessionEvent>,
}

impl RequestGateway {
    /// Build a gateway for `base_url` (origin plus path prefix).
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidHeader`] if `tenant_id` is not a legal
    /// header value.
    pub fn new(
        base_url: impl Into<String>,
        tenant_id: &str,
        session: Arc<SessionStore>,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, ApiError> {
        let tenant = HeaderValue::from_str(tenant_id)
            .map_err(|e| ApiError::InvalidHeader(format!("{TENANT_HEADER}: {e}")))?;
        let (events, _) = broadcast::channel(SESSION_EVENT_CAPACITY);
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            tenant,
            session,
            transport,
            events,
        })
    }

    /// Build a gateway from parsed config.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidHeader`] if the configured tenant is not a
    /// legal header value.
    pub fn from_config(
        config: &StorefrontConfig,
        session: Arc<SessionStore>,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, ApiError> {
        Self::new(config.api_base_url.clone(), &config.tenant_id, session, transport)
    }

    #[must_use]
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Receive [`SessionEvent`]s published after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// `GET endpoint`.
    ///
    /// # Errors
    ///
    /// See [`RequestGateway::request`].
    pub async fn get(&self, endpoint: &str) -> Result<Value, ApiError> {
        self.request(endpoint, &RequestOptions::get()).await
    }

    /// `POST endpoint` with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`RequestGateway::request`].
    pub async fn post(&self, endpoint: &str, body: Value) -> Result<Value, ApiError> {
        self.request(endpoint, &RequestOptions::post(body)).await
    }

    /// Send one request and return the parsed body unchanged on 2xx.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Transport`] if no response arrived
    /// - [`ApiError::Unauthorized`] on 401, after the session is cleared
    /// - [`ApiError::Http`] on any other non-2xx status
    /// - [`ApiError::InvalidHeader`] / [`ApiError::Encode`] if the request
    ///   cannot be built
    pub async fn request(&self, endpoint: &str, options: &RequestOptions) -> Result<Value, ApiError> {
        let token = self.session.token().filter(|t| !t.is_empty());
        let headers = self.build_headers(&options.headers, token.as_deref())?;
        let body = encode_body(&options.body)?;
        let url = self.url_for(endpoint);

        tracing::debug!(method = %options.method, %url, authenticated = token.is_some(), "dispatching request");

        let response = self
            .transport
            .send(OutgoingRequest { method: options.method.clone(), url, headers, body })
            .await?;

        tracing::debug!(status = response.status, endpoint, "response received");

        if response.status == 401 {
            self.expire_session();
        }

        let payload = parse_body(&response.body);

        if !(200..300).contains(&response.status) {
            let message = error_message(&payload);
            if response.status == 401 {
                return Err(ApiError::Unauthorized { message });
            }
            return Err(ApiError::Http { status: response.status, message });
        }

        Ok(payload)
    }

    fn url_for(&self, endpoint: &str) -> String {
        if endpoint.starts_with('/') {
            format!("{}{endpoint}", self.base_url)
        } else {
            format!("{}/{endpoint}", self.base_url)
        }
    }

    fn build_headers(&self, caller: &BTreeMap<String, String>, token: Option<&str>) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        for (name, value) in caller {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| ApiError::InvalidHeader(format!("{name}: {e}")))?;
            let header_value = HeaderValue::from_str(value).map_err(|e| ApiError::InvalidHeader(format!("{name}: {e}")))?;
            headers.insert(header_name, header_value);
        }

        headers.insert(HeaderName::from_static(TENANT_HEADER), self.tenant.clone());

        if let Some(token) = token {
            let mut bearer = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| ApiError::InvalidHeader(format!("authorization: {e}")))?;
            bearer.set_sensitive(true);
            headers.insert(AUTHORIZATION, bearer);
        }

        Ok(headers)
    }

    fn expire_session(&self) {
        if let Err(e) = self.session.expire() {
            tracing::warn!(error = %e, "failed to clear persisted session after 401");
        }
        tracing::info!("session expired");
        if self.events.send(SessionEvent::Expired).is_err() {
            tracing::debug!("no session event subscribers");
        }
    }
}

fn encode_body(body: &RequestBody) -> Result<Option<String>, ApiError> {
    match body {
        RequestBody::Empty => Ok(None),
        RequestBody::Text(text) => Ok(Some(text.clone())),
        RequestBody::Json(value) => serde_json::to_string(value)
            .map(Some)
            .map_err(|e| ApiError::Encode(e.to_string())),
    }
}

fn parse_body(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::Object(Map::new()))
}

fn error_message(payload: &Value) -> String {
    payload
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .unwrap_or(FALLBACK_ERROR_MESSAGE)
        .to_owned()
}

#[cfg(test)]
#[path = "gateway_test.rs"]
mod tests;
