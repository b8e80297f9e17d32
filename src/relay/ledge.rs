// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Relay for the ledge listener.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use hyper::header::{self, HeaderMap, HeaderValue};
use hyper::{Method, Response, StatusCode};

use crate::core::{InboundRequest, ProxyError, Relay, RelayBody, RelayResponse};
use crate::headers::HeaderPolicy;
use crate::hooks::{HookPoint, HookRegistry};
use crate::resolver::BackendResolver;
use crate::{debug_fmt, trace_fmt, warn_fmt};

use super::{Upstream, upstream_url};

/// Notification channel the client polls; answered locally and never proxied.
pub const NOTIFICATIONS_PATH: &str = "/leagues-ledge/v2/notifications";

/// Forwards ledge traffic to the backend named by the player config.
#[derive(Debug, Clone)]
pub struct LedgeRelay {
    upstream: Upstream,
    resolver: Arc<BackendResolver>,
    hooks: Arc<HookRegistry>,
}

impl LedgeRelay {
    pub fn new(upstream: Upstream, resolver: Arc<BackendResolver>, hooks: Arc<HookRegistry>) -> Self {
        Self {
            upstream,
            resolver,
            hooks,
        }
    }

    fn build_outbound(&self, base: &str, request: &InboundRequest) -> reqwest::RequestBuilder {
        let url = upstream_url(base, &request.path_and_query());
        let policy = HeaderPolicy::for_ledge(&request.method);
        let mut headers = policy.build(&request.headers);

        let builder = self.upstream.client().request(request.method.clone(), &url);
        if policy != HeaderPolicy::LedgeWrite {
            return builder.headers(headers);
        }

        if !request.body.is_empty() && !headers.contains_key(header::CONTENT_TYPE) {
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        reapply_content_length(&mut headers, request.body.len(), request);

        builder.headers(headers).body(request.body.clone())
    }

    async fn forward(&self, request: &InboundRequest) -> Result<RelayResponse, ProxyError> {
        let base = self.resolver.get()?;
        let response = self.upstream.send(self.build_outbound(&base, request)).await?;

        let status = response.status();
        let upstream_headers = response.headers().clone();
        let content_type = upstream_headers
            .get(header::CONTENT_TYPE)
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static("application/json"));
        let encoding = upstream_headers.get(header::CONTENT_ENCODING).cloned();

        let builder = Response::builder()
            .status(status)
            .header(header::CONTENT_TYPE, content_type);

        // Encoded bodies and bodies nobody wants to rewrite are streamed as-is.
        if encoding.is_some() || !self.hooks.has_hooks(HookPoint::Ledge) {
            let mut builder = builder;
            if let Some(encoding) = encoding {
                trace_fmt!("LedgeRelay", "Streaming {:?}-encoded body for {}", encoding, request);
                builder = builder.header(header::CONTENT_ENCODING, encoding);
            }
            if let Some(length) = upstream_headers.get(header::CONTENT_LENGTH) {
                builder = builder.header(header::CONTENT_LENGTH, length.clone());
            }
            return builder
                .body(RelayBody::wrap_stream(response.bytes_stream()))
                .map_err(|e| ProxyError::Other(format!("failed to build response: {e}")));
        }

        let raw = response.bytes().await?;
        let body = match String::from_utf8(raw.to_vec()) {
            Ok(text) => Bytes::from(self.hooks.invoke(HookPoint::Ledge, text, request).await),
            Err(_) => {
                debug_fmt!("LedgeRelay", "Binary body from {}; hooks skipped", request);
                raw
            }
        };

        builder
            .header(header::CONTENT_LENGTH, body.len())
            .body(RelayBody::from(body))
            .map_err(|e| ProxyError::Other(format!("failed to build response: {e}")))
    }
}

/// Keep the client's content-length when it matches the attached body;
/// otherwise replace it with the real length.
fn reapply_content_length(headers: &mut HeaderMap, body_len: usize, request: &InboundRequest) {
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<usize>().ok());

    match declared {
        Some(len) if len == body_len => {}
        Some(len) => {
            warn_fmt!("LedgeRelay", "{} declared content-length {} but carries {} bytes", request, len, body_len);
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(body_len));
        }
        None if headers.contains_key(header::CONTENT_LENGTH) => {
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(body_len));
        }
        None => {}
    }
}

#[async_trait]
impl Relay for LedgeRelay {
    fn name(&self) -> &str {
        "ledge"
    }

    async fn relay(&self, request: InboundRequest) -> Result<RelayResponse, ProxyError> {
        let method = &request.method;
        if *method != Method::GET && *method != Method::POST && *method != Method::PUT {
            return Err(ProxyError::MethodNotAllowed(request.method));
        }

        if request.path == NOTIFICATIONS_PATH {
            debug_fmt!("LedgeRelay", "Swallowing {}", request);
            return Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_LENGTH, 0)
                .body(RelayBody::from(Bytes::new()))
                .map_err(|e| ProxyError::Other(format!("failed to build response: {e}")));
        }

        self.forward(&request).await
    }
}
