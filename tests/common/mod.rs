// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared helpers for the integration tests.

use league_proxy::config::MemoryConfigProvider;
use league_proxy::{LeagueProxy, LeagueProxyLoader, ProxyUrls};
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const PUBLIC_PATH: &str = "/api/v1/config/public";
pub const PLAYER_PATH: &str = "/api/v1/config/player";

/// Loader with both listeners on ephemeral ports and `config_upstream` as
/// the config service.
#[allow(dead_code)]
pub fn loader_for(config_upstream: &MockServer) -> LeagueProxyLoader {
    LeagueProxy::loader().with_provider(MemoryConfigProvider::new(json!({
        "server": {
            "host": "127.0.0.1",
            "config_port": 0,
            "ledge_port": 0,
            "shutdown_timeout": 1
        },
        "upstream": {"config_url": config_upstream.uri(), "timeout": 2}
    })))
}

/// Build and start a proxy with no hooks.
#[allow(dead_code)]
pub async fn start_proxy(config_upstream: &MockServer) -> (LeagueProxy, ProxyUrls) {
    start_with(loader_for(config_upstream)).await
}

#[allow(dead_code)]
pub async fn start_with(loader: LeagueProxyLoader) -> (LeagueProxy, ProxyUrls) {
    let proxy = loader.build().expect("proxy builds");
    let urls = proxy.start().await.expect("proxy starts");
    (proxy, urls)
}

/// Player config naming `ledge_url` as the ledge backend.
#[allow(dead_code)]
pub fn player_config(ledge_url: &str) -> Value {
    json!({
        "lol.client_settings.league_edge.url": ledge_url,
        "lol.client_settings.store.enabled": true
    })
}

/// Serve `body` for GET `route` on `server`.
#[allow(dead_code)]
pub async fn mount_json(server: &MockServer, route: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Fetch the player config through the proxy so the ledge backend resolves.
#[allow(dead_code)]
pub async fn resolve_ledge(urls: &ProxyUrls) {
    let response = reqwest::get(format!("{}{}", urls.config, PLAYER_PATH))
        .await
        .expect("player config request");
    assert!(response.status().is_success());
    response.bytes().await.expect("player config body");
}
