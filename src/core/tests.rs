// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::*;
use crate::config::ConfigError;

#[test]
fn test_inbound_request_splits_query() {
    let request = InboundRequest::new(Method::GET, "/api/v1/config/player?os=windows&region=EUW1");
    assert_eq!(request.path, "/api/v1/config/player");
    assert_eq!(request.query.as_deref(), Some("os=windows&region=EUW1"));
    assert_eq!(request.path_and_query(), "/api/v1/config/player?os=windows&region=EUW1");
}

#[test]
fn test_inbound_request_without_query() {
    let request = InboundRequest::new(Method::GET, "/api/v1/config/public");
    assert!(request.query.is_none());
    assert_eq!(request.path_and_query(), "/api/v1/config/public");
    assert_eq!(request.to_string(), "GET /api/v1/config/public");
}

#[test]
fn test_header_lookup_is_case_insensitive() {
    let mut request = InboundRequest::new(Method::GET, "/");
    request.headers.insert(
        hyper::header::HeaderName::from_bytes(b"User-Agent").unwrap(),
        "RiotClient/1.0".parse().unwrap(),
    );
    assert_eq!(request.header("user-agent"), Some("RiotClient/1.0"));
    assert_eq!(request.header("USER-AGENT"), Some("RiotClient/1.0"));
    assert_eq!(request.header("authorization"), None);
}

#[test]
fn test_error_status_codes() {
    assert_eq!(ProxyError::BackendNotResolved.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        ProxyError::Timeout(Duration::from_secs(3)).status_code(),
        StatusCode::GATEWAY_TIMEOUT
    );
    assert_eq!(
        ProxyError::MethodNotAllowed(Method::DELETE).status_code(),
        StatusCode::METHOD_NOT_ALLOWED
    );
    assert_eq!(
        ProxyError::InvalidRequest("truncated".into()).status_code(),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        ProxyError::Other("boom".into()).status_code(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[test]
fn test_error_messages() {
    assert_eq!(
        ProxyError::BackendNotResolved.to_string(),
        "ledge backend has not been resolved yet"
    );

    let err = ProxyError::HookContractViolation {
        hook: "flags".into(),
        reason: "returned no text".into(),
    };
    assert_eq!(
        err.to_string(),
        "content hook 'flags' violated its contract: returned no text"
    );
}

#[test]
fn test_config_error_conversion() {
    let err: ProxyError = ConfigError::ParseError("bad port".into()).into();
    match err {
        ProxyError::ConfigError(msg) => assert!(msg.contains("bad port")),
        other => panic!("unexpected variant: {other:?}"),
    }
}
