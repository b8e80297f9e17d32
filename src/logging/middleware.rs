// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Request/response logging with trace context.

use hyper::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use hyper::{Method, Response};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::logging::config::LoggingConfig;
use crate::logging::is_structured_logging;
use crate::logging::structured::{RequestInfo, generate_trace_id, with_request_context};

/// Logs one line when a request arrives and one when its response headers
/// leave.
#[derive(Debug, Clone)]
pub struct RequestLogger {
    listener: String,
    config: Arc<LoggingConfig>,
    trace_header: HeaderName,
}

impl RequestLogger {
    pub fn new(listener: &str, config: LoggingConfig) -> Self {
        let trace_header = HeaderName::from_bytes(config.trace_id_header.as_bytes())
            .unwrap_or_else(|_| HeaderName::from_static("x-trace-id"));
        Self {
            listener: listener.to_string(),
            config: Arc::new(config),
            trace_header,
        }
    }

    /// Header the trace ID is read from and echoed on.
    pub fn trace_header(&self) -> &HeaderName {
        &self.trace_header
    }

    /// Record an incoming request.
    pub fn begin(
        &self,
        method: &Method,
        path: &str,
        headers: &HeaderMap,
        remote_addr: Option<SocketAddr>,
    ) -> RequestInfo {
        let trace_id = self
            .config
            .propagate_trace_id
            .then(|| headers.get(&self.trace_header))
            .flatten()
            .and_then(|h| h.to_str().ok())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(generate_trace_id);

        let user_agent = headers
            .get(USER_AGENT)
            .and_then(|h| h.to_str().ok())
            .unwrap_or("unknown")
            .to_string();

        let mut info = RequestInfo::new(
            &self.listener,
            method.to_string(),
            path.to_string(),
            remote_addr.map_or_else(|| "unknown".to_string(), |a| a.to_string()),
            user_agent,
        );
        info.trace_id = trace_id;

        if self.structured() {
            let logger = with_request_context(&slog_scope::logger(), &info);
            slog::info!(logger, "Request received"; "user_agent" => &info.user_agent);
        } else {
            log::info!(
                "[{}] {} {} from {} (trace_id: {})",
                info.listener,
                info.method,
                info.path,
                info.remote_addr,
                info.trace_id
            );
        }

        info
    }

    /// Record the response and stamp the trace ID on it.
    ///
    /// Runs once the status and headers are ready. A streamed body may still
    /// be in flight, so the elapsed time is time to headers.
    pub fn finish<B>(&self, response: &mut Response<B>, info: &RequestInfo) {
        let status = response.status().as_u16();
        let elapsed_ms = info.elapsed_ms();

        if self.structured() {
            let logger = with_request_context(&slog_scope::logger(), info);
            slog::info!(logger, "Response headers sent";
                "status" => status,
                "headers_ms" => elapsed_ms
            );
        } else {
            log::info!("{}", completion_line(info, status, elapsed_ms));
        }

        if self.config.include_trace_id {
            if let Ok(value) = HeaderValue::from_str(&info.trace_id) {
                response.headers_mut().insert(self.trace_header.clone(), value);
            }
        }
    }

    fn structured(&self) -> bool {
        self.config.structured && is_structured_logging()
    }
}

/// Plain-text line logged by [`RequestLogger::finish`].
pub(crate) fn completion_line(info: &RequestInfo, status: u16, elapsed_ms: i64) -> String {
    format!(
        "[{}] {} {} -> {} headers in {}ms (trace_id: {})",
        info.listener, info.method, info.path, status, elapsed_ms, info.trace_id
    )
}
