// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Relay for the config listener.

use std::sync::Arc;

use async_trait::async_trait;
use hyper::Method;

use crate::core::{InboundRequest, ProxyError, Relay, RelayResponse};
use crate::headers::HeaderPolicy;
use crate::hooks::{HookPoint, HookRegistry};
use crate::resolver::BackendResolver;
use crate::{debug_fmt, warn_fmt};

use super::{Upstream, json_response, upstream_url};

/// Route a config request falls under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigRoute {
    /// `/api/v1/config/public`
    Public,
    /// `/api/v1/config/player`
    Player,
    /// Any other path; proxied without hooks
    Passthrough,
}

impl ConfigRoute {
    /// Classify a request path.
    pub fn classify(path: &str) -> Self {
        match path {
            "/api/v1/config/public" => ConfigRoute::Public,
            "/api/v1/config/player" => ConfigRoute::Player,
            _ => ConfigRoute::Passthrough,
        }
    }
}

/// Forwards config requests to the fixed config host.
#[derive(Debug, Clone)]
pub struct ConfigRelay {
    upstream: Upstream,
    base_url: String,
    resolver: Arc<BackendResolver>,
    hooks: Arc<HookRegistry>,
}

impl ConfigRelay {
    pub fn new(
        upstream: Upstream,
        base_url: impl Into<String>,
        resolver: Arc<BackendResolver>,
        hooks: Arc<HookRegistry>,
    ) -> Self {
        Self {
            upstream,
            base_url: base_url.into(),
            resolver,
            hooks,
        }
    }

    /// Base URL requests are forwarded to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch(&self, request: &InboundRequest) -> Result<reqwest::Response, ProxyError> {
        let url = upstream_url(&self.base_url, &request.path_and_query());
        let outbound = self
            .upstream
            .client()
            .get(&url)
            .headers(HeaderPolicy::Config.build(&request.headers));

        self.upstream.send(outbound).await
    }
}

#[async_trait]
impl Relay for ConfigRelay {
    fn name(&self) -> &str {
        "config"
    }

    async fn relay(&self, request: InboundRequest) -> Result<RelayResponse, ProxyError> {
        if request.method != Method::GET {
            return Err(ProxyError::MethodNotAllowed(request.method));
        }

        let route = ConfigRoute::classify(&request.path);
        let response = self.fetch(&request).await?;
        let status = response.status();
        let raw = response.bytes().await?;

        let point = match route {
            ConfigRoute::Public => HookPoint::ConfigPublic,
            ConfigRoute::Player => HookPoint::ConfigPlayer,
            ConfigRoute::Passthrough => {
                debug_fmt!("ConfigRelay", "Passing {} through unmodified", request);
                return json_response(status, raw);
            }
        };

        let body = match String::from_utf8(raw.to_vec()) {
            Ok(text) => text,
            Err(e) => {
                warn_fmt!("ConfigRelay", "{} returned non UTF-8 content, decoding lossily", request);
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };

        if route == ConfigRoute::Player {
            self.resolver.resolve_from_player_config(&body);
        }

        let body = self.hooks.invoke(point, body, &request).await;
        json_response(status, body.into())
    }
}
