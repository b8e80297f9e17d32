// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::logging::config::LoggingConfig;
    use crate::logging::middleware::{RequestLogger, completion_line};
    use crate::logging::structured::{LogFormat, RequestInfo, create_logger};
    use crate::logging::test_logger;
    use hyper::header::{HeaderMap, HeaderValue};
    use hyper::{Method, Response, StatusCode};
    use log::LevelFilter;
    use serde_json::json;
    use std::net::SocketAddr;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level(Some("debug")), LevelFilter::Debug);
        assert_eq!(parse_level(Some("WARN")), LevelFilter::Warn);
        assert_eq!(parse_level(Some("off")), LevelFilter::Off);
        assert_eq!(parse_level(Some("verbose")), LevelFilter::Info);
        assert_eq!(parse_level(None), LevelFilter::Info);
    }

    #[test]
    fn test_init_is_idempotent() {
        init(Some(LevelFilter::Debug));
        init(Some(LevelFilter::Error));
        init_with_config(None, Some(LoggingConfig::default()));
        log_info("Test", "still alive");
    }

    #[test]
    fn test_log_error_returns_error() {
        let err = log_error("Test", "upstream went away".to_string());
        assert_eq!(err, "upstream went away");
    }

    #[test]
    fn test_logging_config_defaults_from_partial_section() {
        let config: LoggingConfig =
            serde_json::from_value(json!({"structured": true, "format": "json"})).unwrap();

        assert!(config.structured);
        assert!(config.include_trace_id);
        assert!(config.propagate_trace_id);
        assert_eq!(config.trace_id_header, "x-trace-id");
        assert_eq!(config.log_level(), log::Level::Info);
        assert_eq!(config.to_logger_config().format, LogFormat::Json);
    }

    #[test]
    fn test_logger_config_levels_and_fields() {
        let mut config = LoggingConfig {
            level: "critical".to_string(),
            ..Default::default()
        };
        config.static_fields.insert("service".to_string(), "league-proxy".to_string());

        let logger_config = config.to_logger_config();
        assert_eq!(logger_config.level, slog::Level::Critical);
        assert_eq!(logger_config.format, LogFormat::Terminal);
        assert_eq!(
            logger_config.static_fields,
            vec![("service".to_string(), "league-proxy".to_string())]
        );
        assert_eq!(config.log_level(), log::Level::Error);

        let logger = create_logger(&logger_config);
        slog::info!(logger, "structured logger built");
    }

    #[test]
    fn test_request_info_elapsed_is_non_negative() {
        let info = RequestInfo::new(
            "config",
            "GET".to_string(),
            "/api/v1/config/public".to_string(),
            "127.0.0.1:50000".to_string(),
            "RiotClient".to_string(),
        );
        assert!(info.elapsed_ms() >= 0);
        assert_eq!(info.trace_id.len(), 36);
    }

    #[test]
    fn test_request_logger_generates_and_echoes_trace_id() {
        test_logger::init_test_logger();
        let logger = RequestLogger::new("ledge", LoggingConfig::default());
        let remote: SocketAddr = "127.0.0.1:50000".parse().unwrap();

        let info = logger.begin(&Method::GET, "/login-queue/v2", &HeaderMap::new(), Some(remote));
        assert_eq!(info.listener, "ledge");
        assert_eq!(info.remote_addr, "127.0.0.1:50000");
        assert_eq!(info.user_agent, "unknown");

        let mut response = Response::new(());
        *response.status_mut() = StatusCode::BAD_GATEWAY;
        logger.finish(&mut response, &info);

        assert_eq!(
            response.headers().get("x-trace-id").unwrap(),
            info.trace_id.as_str()
        );
    }

    #[test]
    fn test_completion_line_reports_time_to_headers() {
        let info = RequestInfo::new(
            "ledge",
            "GET".to_string(),
            "/leagues-ledge/v2/notifications".to_string(),
            "127.0.0.1:50000".to_string(),
            "unknown".to_string(),
        );

        let line = completion_line(&info, 200, 12);
        assert!(line.starts_with("[ledge] GET /leagues-ledge/v2/notifications -> 200 headers in 12ms"));
        assert!(line.ends_with(&format!("(trace_id: {})", info.trace_id)));
    }

    #[test]
    fn test_request_logger_propagates_client_trace_id() {
        let logger = RequestLogger::new("config", LoggingConfig::default());
        let mut headers = HeaderMap::new();
        headers.insert("x-trace-id", HeaderValue::from_static("abc-123"));

        let info = logger.begin(&Method::GET, "/", &headers, None);
        assert_eq!(info.trace_id, "abc-123");
        assert_eq!(info.remote_addr, "unknown");
    }

    #[test]
    fn test_request_logger_respects_disabled_options() {
        let config = LoggingConfig {
            include_trace_id: false,
            propagate_trace_id: false,
            trace_id_header: "X-Request-ID".to_string(),
            ..Default::default()
        };
        let logger = RequestLogger::new("config", config);
        assert_eq!(logger.trace_header().as_str(), "x-request-id");

        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", HeaderValue::from_static("client-id"));
        let info = logger.begin(&Method::POST, "/", &headers, None);
        assert_ne!(info.trace_id, "client-id");

        let mut response = Response::new(());
        logger.finish(&mut response, &info);
        assert!(response.headers().get("x-request-id").is_none());
    }

    #[test]
    fn test_invalid_trace_header_name_falls_back() {
        let config = LoggingConfig {
            trace_id_header: "not a header".to_string(),
            ..Default::default()
        };
        let logger = RequestLogger::new("config", config);
        assert_eq!(logger.trace_header().as_str(), "x-trace-id");
    }
}
