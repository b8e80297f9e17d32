// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Structured logging built on slog, with JSON output and per-request
//! context.

use chrono::{DateTime, Utc};
use slog::{Drain, Logger, o};
use slog_async::Async;
use slog_json::Json;
use slog_term::{FullFormat, TermDecorator};
use std::io;
use uuid::Uuid;

/// Structured logging format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable terminal output
    Terminal,
    /// JSON formatted output
    Json,
}

/// Structured logger configuration
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub format: LogFormat,
    pub level: slog::Level,
    /// Key-value pairs attached to every record
    pub static_fields: Vec<(String, String)>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Terminal,
            level: slog::Level::Info,
            static_fields: Vec::new(),
        }
    }
}

/// Create a structured logger with the given configuration
pub fn create_logger(config: &LoggerConfig) -> Logger {
    let logger = match config.format {
        LogFormat::Terminal => {
            let decorator = TermDecorator::new().build();
            let drain = FullFormat::new(decorator).build().fuse();
            let drain = drain.filter_level(config.level).fuse();
            Logger::root(Async::new(drain).build().fuse(), o!())
        }
        LogFormat::Json => {
            let drain = Json::new(io::stdout()).add_default_keys().build().fuse();
            let drain = drain.filter_level(config.level).fuse();
            Logger::root(Async::new(drain).build().fuse(), o!())
        }
    };

    config.static_fields.iter().fold(logger, |logger, (key, value)| {
        // slog keys are 'static; static fields are installed once per process.
        let key: &'static str = Box::leak(key.clone().into_boxed_str());
        logger.new(o!(key => value.clone()))
    })
}

/// Generate a new trace ID
pub fn generate_trace_id() -> String {
    Uuid::new_v4().to_string()
}

/// Create a child logger with request context
pub fn with_request_context(logger: &Logger, info: &RequestInfo) -> Logger {
    logger.new(o!(
        "trace_id" => info.trace_id.clone(),
        "listener" => info.listener.clone(),
        "method" => info.method.clone(),
        "path" => info.path.clone(),
        "remote_addr" => info.remote_addr.clone(),
    ))
}

/// Per-request logging context.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub trace_id: String,
    /// Listener that accepted the request (`config` or `ledge`)
    pub listener: String,
    pub method: String,
    pub path: String,
    pub remote_addr: String,
    pub user_agent: String,
    pub started_at: DateTime<Utc>,
}

impl RequestInfo {
    pub fn new(listener: &str, method: String, path: String, remote_addr: String, user_agent: String) -> Self {
        Self {
            trace_id: generate_trace_id(),
            listener: listener.to_string(),
            method,
            path,
            remote_addr,
            user_agent,
            started_at: Utc::now(),
        }
    }

    /// Milliseconds since the request was received.
    pub fn elapsed_ms(&self) -> i64 {
        (Utc::now() - self.started_at).num_milliseconds().max(0)
    }
}

/// Keeps the global slog logger installed while alive.
pub struct LoggerGuard {
    _guard: slog_scope::GlobalLoggerGuard,
}

/// Install the global structured logger.
pub fn init_global_logger(config: &LoggerConfig) -> LoggerGuard {
    let logger = create_logger(config);
    LoggerGuard {
        _guard: slog_scope::set_global_logger(logger),
    }
}
