// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::*;
use std::thread;

#[test]
fn test_get_fails_until_set() {
    let resolver = BackendResolver::new();
    assert!(!resolver.is_resolved());
    assert!(matches!(resolver.get(), Err(ProxyError::BackendNotResolved)));
    // Still failing on a second read
    assert!(matches!(resolver.get(), Err(ProxyError::BackendNotResolved)));
}

#[test]
fn test_set_then_get_returns_value() {
    let resolver = BackendResolver::new();
    resolver.set("https://euw-red.lol.sgp.pvp.net");
    assert!(resolver.is_resolved());
    assert_eq!(resolver.get().unwrap().as_str(), "https://euw-red.lol.sgp.pvp.net");

    resolver.set("https://na-blue.lol.sgp.pvp.net");
    assert_eq!(resolver.get().unwrap().as_str(), "https://na-blue.lol.sgp.pvp.net");
}

#[test]
fn test_resolve_from_player_config() {
    let resolver = BackendResolver::new();
    let body = r#"{"lol.client_settings.league_edge.url": "https://ledge.example", "other": 1}"#;

    let outcome = resolver.resolve_from_player_config(body);

    assert_eq!(outcome, Resolution::Resolved("https://ledge.example".into()));
    assert_eq!(resolver.get().unwrap().as_str(), "https://ledge.example");
}

#[test]
fn test_field_absent_keeps_previous_value() {
    let resolver = BackendResolver::new();
    assert_eq!(
        resolver.resolve_from_player_config(r#"{"chat.port": 5223}"#),
        Resolution::FieldAbsent
    );
    assert!(resolver.get().is_err());

    resolver.set("https://ledge.example");
    assert_eq!(
        resolver.resolve_from_player_config(r#"{"chat.port": 5223}"#),
        Resolution::FieldAbsent
    );
    assert_eq!(resolver.get().unwrap().as_str(), "https://ledge.example");
}

#[test]
fn test_null_field_counts_as_absent() {
    let resolver = BackendResolver::new();
    resolver.set("https://ledge.example");
    let outcome = resolver.resolve_from_player_config(r#"{"lol.client_settings.league_edge.url": null}"#);
    assert_eq!(outcome, Resolution::FieldAbsent);
    assert_eq!(resolver.get().unwrap().as_str(), "https://ledge.example");
}

#[test]
fn test_dotted_key_is_not_a_nested_path() {
    let body = r#"{"lol": {"client_settings": {"league_edge": {"url": "https://nested.example"}}}}"#;
    assert_eq!(extract_ledge_url(body).unwrap(), None);
}

#[test]
fn test_malformed_body_is_not_fatal() {
    let resolver = BackendResolver::new();
    resolver.set("https://ledge.example");

    let outcome = resolver.resolve_from_player_config("<html>maintenance</html>");

    assert!(matches!(outcome, Resolution::Malformed(_)));
    assert_eq!(resolver.get().unwrap().as_str(), "https://ledge.example");
}

#[test]
fn test_invalid_url_is_ignored() {
    let resolver = BackendResolver::new();
    let outcome = resolver.resolve_from_player_config(r#"{"lol.client_settings.league_edge.url": "not a url"}"#);
    assert_eq!(outcome, Resolution::InvalidUrl("not a url".into()));
    assert!(!resolver.is_resolved());
}

#[test]
fn test_non_string_value_uses_json_text() {
    let body = r#"{"lol.client_settings.league_edge.url": 42}"#;
    assert_eq!(extract_ledge_url(body).unwrap(), Some("42".to_string()));
}

#[test]
fn test_concurrent_readers_never_see_partial_values() {
    let resolver = Arc::new(BackendResolver::new());
    let candidates = ["https://a.example", "https://bb.example", "https://ccc.example"];

    let writer = {
        let resolver = resolver.clone();
        thread::spawn(move || {
            for i in 0..2_000 {
                resolver.set(candidates[i % candidates.len()]);
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let resolver = resolver.clone();
            thread::spawn(move || {
                for _ in 0..2_000 {
                    if let Ok(url) = resolver.get() {
                        assert!(candidates.contains(&url.as_str()), "torn value {url}");
                    }
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    assert!(resolver.is_resolved());
}
