// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Core primitives – inbound requests, relay responses & errors.
//!
//! Everything that moves between the listener and a relay is defined here.
//! Socket handling lives in `server` and the per-endpoint forwarding logic
//! in `relay`.

#[cfg(test)]
mod tests;

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use hyper::{HeaderMap, Method, Response, StatusCode};
use thiserror::Error;

/// Body type handed back to the listener. Reqwest's body implements
/// `http_body::Body`, so upstream streams can be returned without copying.
pub type RelayBody = reqwest::Body;

/// Response produced by a relay.
pub type RelayResponse = Response<RelayBody>;

/// Errors that can occur while relaying a request.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// The upstream host could not be reached or the transfer failed
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(#[from] reqwest::Error),

    /// Upstream did not answer within the configured timeout
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// A ledge request arrived before any player config named the backend
    #[error("ledge backend has not been resolved yet")]
    BackendNotResolved,

    /// A content hook failed to return text
    #[error("content hook '{hook}' violated its contract: {reason}")]
    HookContractViolation { hook: String, reason: String },

    /// The listener does not serve this verb
    #[error("method {0} not allowed")]
    MethodNotAllowed(Method),

    /// The inbound request could not be read
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<crate::config::error::ConfigError> for ProxyError {
    fn from(err: crate::config::error::ConfigError) -> Self {
        ProxyError::ConfigError(err.to_string())
    }
}

impl ProxyError {
    /// Status code reported to the client when this error ends a request.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            ProxyError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::BackendNotResolved => StatusCode::SERVICE_UNAVAILABLE,
            ProxyError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ProxyError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short message used as the body of an error response.
    pub fn client_message(&self) -> &'static str {
        match self {
            ProxyError::UpstreamUnavailable(_) => "Bad Gateway",
            ProxyError::Timeout(_) => "Gateway Timeout",
            ProxyError::BackendNotResolved => "Ledge backend not resolved",
            ProxyError::MethodNotAllowed(_) => "Method Not Allowed",
            ProxyError::InvalidRequest(_) => "Bad Request",
            _ => "Internal Server Error",
        }
    }
}

/// A request received on one of the local listeners.
///
/// The body has already been collected; relays that forward it attach the
/// bytes verbatim.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub client_ip: Option<String>,
}

impl InboundRequest {
    /// Create a request with no body and no headers.
    pub fn new(method: Method, path_and_query: &str) -> Self {
        let (path, query) = match path_and_query.split_once('?') {
            Some((p, q)) => (p.to_string(), Some(q.to_string())),
            None => (path_and_query.to_string(), None),
        };

        Self {
            method,
            path,
            query,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            client_ip: None,
        }
    }

    /// Path plus the raw query string, as it should be appended to an
    /// upstream base URL.
    pub fn path_and_query(&self) -> String {
        match &self.query {
            Some(q) => format!("{}?{}", self.path, q),
            None => self.path.clone(),
        }
    }

    /// Case-insensitive header lookup returning the first value as text.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

impl fmt::Display for InboundRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path_and_query())
    }
}

/// One proxy endpoint served by its own listener.
#[async_trait::async_trait]
pub trait Relay: fmt::Debug + Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Forward the request and produce the response for the client.
    async fn relay(&self, request: InboundRequest) -> Result<RelayResponse, ProxyError>;
}
