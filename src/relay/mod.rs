// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The two relays and the upstream client they share.
//!
//! * [`ConfigRelay`] forwards config requests to the fixed config host and
//!   learns the ledge backend from the player config.
//! * [`LedgeRelay`] forwards everything else to whatever backend the
//!   [`BackendResolver`](crate::resolver::BackendResolver) currently holds.

mod config;
mod ledge;


use std::time::{Duration, Instant};

use bytes::Bytes;
use hyper::header::{self, HeaderValue};
use hyper::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::time::timeout;

use crate::core::{ProxyError, RelayBody, RelayResponse};
use crate::debug_fmt;

pub use config::{ConfigRelay, ConfigRoute};
pub use ledge::{LedgeRelay, NOTIFICATIONS_PATH};

/// Production config service.
pub const DEFAULT_CONFIG_URL: &str = "https://clientconfig.rpg.riotgames.com";

/// Upstream settings (`upstream.*`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the config service
    #[serde(default = "default_config_url")]
    pub config_url: String,

    /// Per-request timeout in seconds; unset means the transport default
    #[serde(default)]
    pub timeout: Option<u64>,
}

fn default_config_url() -> String {
    DEFAULT_CONFIG_URL.to_string()
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            config_url: default_config_url(),
            timeout: None,
        }
    }
}

/// Long-lived HTTP client used for every upstream call.
///
/// Cloning is cheap and shares the connection pool.
#[derive(Debug, Clone)]
pub struct Upstream {
    client: reqwest::Client,
    timeout: Option<Duration>,
}

impl Upstream {
    /// Build the shared client. Cookies are never stored and bodies are
    /// never decompressed, so encoded responses pass through untouched.
    pub fn new(config: &UpstreamConfig) -> Result<Self, ProxyError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(ProxyError::UpstreamUnavailable)?;

        Ok(Self::with_client(client, config.timeout.map(Duration::from_secs)))
    }

    /// Wrap an existing client.
    pub fn with_client(client: reqwest::Client, timeout: Option<Duration>) -> Self {
        Self { client, timeout }
    }

    /// The underlying client, for building requests.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Send a request, applying the configured timeout. Never retries.
    pub async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ProxyError> {
        let started = Instant::now();

        let response = match self.timeout {
            Some(limit) => timeout(limit, request.send())
                .await
                .map_err(|_| ProxyError::Timeout(limit))?,
            None => request.send().await,
        }
        .map_err(|e| {
            if e.is_timeout() {
                ProxyError::Timeout(self.timeout.unwrap_or_default())
            } else {
                ProxyError::UpstreamUnavailable(e)
            }
        })?;

        debug_fmt!("Upstream", "{} answered {} in {:?}", response.url(), response.status(), started.elapsed());
        Ok(response)
    }
}

/// Join an upstream base URL with the client's path and query.
pub(crate) fn upstream_url(base: &str, path_and_query: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path_and_query)
}

/// Build a JSON response with an exact content-length.
pub(crate) fn json_response(status: StatusCode, body: Bytes) -> Result<RelayResponse, ProxyError> {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))
        .header(header::CONTENT_LENGTH, body.len())
        .body(RelayBody::from(body))
        .map_err(|e| ProxyError::Other(format!("failed to build response: {e}")))
}
