// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Logging utilities for the proxy.
//!
//! Everything logs through the `log` facade. By default `env_logger` prints
//! it; with `proxy.logging.structured = true` the facade is bridged into a
//! global `slog` logger that writes terminal or JSON records instead.

pub mod config;
pub mod middleware;
pub mod structured;
pub mod wrapper;

#[cfg(test)]
pub(crate) mod test_logger;
#[cfg(test)]
mod tests;

use log::{LevelFilter, error, info};
use once_cell::sync::OnceCell;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};

use self::config::LoggingConfig;
use self::structured::LoggerGuard;

static INIT: Once = Once::new();
static USING_STRUCTURED: AtomicBool = AtomicBool::new(false);
static GLOBAL_GUARD: OnceCell<LoggerGuard> = OnceCell::new();

/// Initialize plain `env_logger` output at `level` (info when `None`).
///
/// Only the first initialization in a process has any effect.
pub fn init(level: Option<LevelFilter>) {
    INIT.call_once(|| init_env_logger(level));
}

/// Initialize logging from a `proxy.logging` section.
pub fn init_with_config(level: Option<LevelFilter>, config: Option<LoggingConfig>) {
    INIT.call_once(|| match config {
        Some(config) if config.structured => init_structured(&config),
        _ => init_env_logger(level),
    });
}

/// Whether the slog bridge is active.
pub fn is_structured_logging() -> bool {
    USING_STRUCTURED.load(Ordering::Relaxed)
}

/// Parse a level name such as the value of `RUST_LOG_LEVEL`.
pub fn parse_level(name: Option<&str>) -> LevelFilter {
    match name.map(str::to_lowercase).as_deref() {
        Some("trace") => LevelFilter::Trace,
        Some("debug") => LevelFilter::Debug,
        Some("warn") => LevelFilter::Warn,
        Some("error") => LevelFilter::Error,
        Some("off") => LevelFilter::Off,
        _ => LevelFilter::Info,
    }
}

fn init_env_logger(level: Option<LevelFilter>) {
    let default = level.unwrap_or(LevelFilter::Info).to_string().to_lowercase();
    let env = env_logger::Env::default().filter_or("RUST_LOG", default);

    if env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .format_target(true)
        .try_init()
        .is_ok()
    {
        info!("Logging initialized at level: {}", log::max_level());
    }
}

fn init_structured(config: &LoggingConfig) {
    let logger_config = config.to_logger_config();
    let guard = structured::init_global_logger(&logger_config);

    match slog_stdlog::init_with_level(config.log_level()) {
        Ok(()) => {
            log::set_max_level(config.log_level().to_level_filter());
            let _ = GLOBAL_GUARD.set(guard);
            USING_STRUCTURED.store(true, Ordering::Relaxed);
            info!("Structured logging initialized with format: {}", config.format);
        }
        Err(e) => {
            // Another `log` backend already owns the facade.
            drop(guard);
            error!("Failed to bridge log records into slog: {}", e);
        }
    }
}

/// Log an error with context and return the error.
pub fn log_error<E: std::fmt::Display>(context: &str, err: E) -> E {
    error!("[{}] {}", context, err);
    err
}

/// Log an info message with context.
pub fn log_info<M: std::fmt::Display>(context: &str, msg: M) {
    info!("[{}] {}", context, msg);
}
