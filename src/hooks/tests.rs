// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::*;
use hyper::Method;

fn player_request() -> InboundRequest {
    InboundRequest::new(Method::GET, "/api/v1/config/player?os=windows")
}

#[derive(Debug)]
struct FailingHook;

#[async_trait]
impl ContentHook for FailingHook {
    fn name(&self) -> &str {
        "failing"
    }

    async fn process(&self, _body: String, _request: &InboundRequest) -> Result<String, ProxyError> {
        Err(ProxyError::Other("no text for you".into()))
    }
}

#[derive(Debug)]
struct PathEcho;

#[async_trait]
impl ContentHook for PathEcho {
    fn name(&self) -> &str {
        "path-echo"
    }

    async fn process(&self, body: String, request: &InboundRequest) -> Result<String, ProxyError> {
        Ok(format!("{body}|{}", request.path))
    }
}

#[tokio::test]
async fn test_empty_chain_is_identity() {
    let chain = ContentHookChain::new();
    assert!(chain.is_empty());
    let out = chain.invoke("{\"a\":1}".to_string(), &player_request()).await;
    assert_eq!(out, "{\"a\":1}");
}

#[tokio::test]
async fn test_hooks_run_in_registration_order() {
    let mut chain = ContentHookChain::new();
    chain.register(hook_fn("f1", |body, _| format!("f1({body})")));
    chain.register(hook_fn("f2", |body, _| format!("f2({body})")));

    let out = chain.invoke("A".to_string(), &player_request()).await;

    assert_eq!(out, "f2(f1(A))");
    assert_eq!(chain.names(), vec!["f1", "f2"]);
}

#[tokio::test]
async fn test_hook_sees_originating_request() {
    let mut chain = ContentHookChain::new();
    chain.register(Arc::new(PathEcho));
    chain.register(hook_fn("query", |body, request| {
        format!("{body}|{}", request.query.clone().unwrap_or_default())
    }));

    let out = chain.invoke("body".to_string(), &player_request()).await;
    assert_eq!(out, "body|/api/v1/config/player|os=windows");
}

#[tokio::test]
async fn test_failing_hook_is_skipped() {
    let mut chain = ContentHookChain::new();
    chain.register(hook_fn("upper", |body, _| body.to_uppercase()));
    chain.register(Arc::new(FailingHook));
    chain.register(hook_fn("suffix", |body, _| format!("{body}!")));

    let out = chain.invoke("hello".to_string(), &player_request()).await;

    assert_eq!(out, "HELLO!");
}

#[tokio::test]
async fn test_only_hook_failing_returns_original_body() {
    let mut chain = ContentHookChain::new();
    chain.register(Arc::new(FailingHook));

    let out = chain.invoke("{\"a\":1}".to_string(), &player_request()).await;

    assert_eq!(out, "{\"a\":1}");
}

#[tokio::test]
async fn test_registry_keeps_chains_separate() {
    let mut registry = HookRegistry::new();
    registry.register(HookPoint::ConfigPublic, hook_fn("public", |b, _| format!("public:{b}")));
    registry.register(HookPoint::ConfigPlayer, hook_fn("player", |b, _| format!("player:{b}")));

    let request = player_request();
    assert_eq!(
        registry.invoke(HookPoint::ConfigPublic, "x".into(), &request).await,
        "public:x"
    );
    assert_eq!(
        registry.invoke(HookPoint::ConfigPlayer, "x".into(), &request).await,
        "player:x"
    );
    assert_eq!(registry.invoke(HookPoint::Ledge, "x".into(), &request).await, "x");

    assert!(registry.has_hooks(HookPoint::ConfigPublic));
    assert!(!registry.has_hooks(HookPoint::Ledge));
    assert!(registry.chain(HookPoint::Ledge).is_empty());
}

#[tokio::test]
async fn test_json_rewrite_hook() {
    let mut registry = HookRegistry::new();
    registry.register(
        HookPoint::ConfigPlayer,
        hook_fn("enable-flag", |body, _| {
            let mut doc: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
            doc["lol.client_settings.experimental"] = serde_json::Value::Bool(true);
            doc.to_string()
        }),
    );

    let out = registry
        .invoke(
            HookPoint::ConfigPlayer,
            r#"{"lol.client_settings.experimental":false}"#.into(),
            &player_request(),
        )
        .await;

    let doc: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(doc["lol.client_settings.experimental"], true);
}

#[test]
fn test_hook_point_display() {
    assert_eq!(HookPoint::ConfigPublic.to_string(), "config-public");
    assert_eq!(HookPoint::ConfigPlayer.to_string(), "config-player");
    assert_eq!(HookPoint::Ledge.to_string(), "ledge");
}

#[test]
fn test_fn_hook_debug_shows_name() {
    let hook = hook_fn("named", |b, _| b);
    assert!(format!("{hook:?}").contains("named"));
}
