// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Ledge backend discovery.
//!
//! The ledge host is not known at startup. It is announced inside the
//! player-config document under a single top-level key and stored here for
//! every later ledge call. The slot is an atomically swapped `Arc`, so a
//! reader sees either nothing or a complete URL. Writes and reads are not
//! ordered against each other: a ledge call racing a player-config response
//! may see the previous value.

#[cfg(test)]
mod tests;

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use serde_json::Value;

use crate::core::ProxyError;
use crate::{debug_fmt, info_fmt, warn_fmt};

/// Top-level key of the player config that carries the ledge base URL.
pub const LEDGE_URL_FIELD: &str = "lol.client_settings.league_edge.url";

/// What feeding a player-config body into the resolver did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The field was present and its URL is now the active backend
    Resolved(String),
    /// The document has no (non-null) ledge field; previous value kept
    FieldAbsent,
    /// The body is not a JSON document
    Malformed(String),
    /// The field holds something that is not an absolute URL
    InvalidUrl(String),
}

/// Holds the ledge base URL shared by every ledge request.
#[derive(Debug, Default)]
pub struct BackendResolver {
    current: ArcSwapOption<String>,
}

impl BackendResolver {
    /// Create an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `url`, replacing any previous value.
    pub fn set(&self, url: impl Into<String>) {
        self.current.store(Some(Arc::new(url.into())));
    }

    /// The active ledge base URL.
    pub fn get(&self) -> Result<Arc<String>, ProxyError> {
        self.current.load_full().ok_or(ProxyError::BackendNotResolved)
    }

    /// Whether a backend has been set.
    pub fn is_resolved(&self) -> bool {
        self.current.load().is_some()
    }

    /// Inspect a player-config body and update the backend if it names one.
    ///
    /// Never fails: a body that cannot be used is reported through the
    /// returned [`Resolution`] and leaves the stored value untouched.
    pub fn resolve_from_player_config(&self, body: &str) -> Resolution {
        let url = match extract_ledge_url(body) {
            Ok(Some(url)) => url,
            Ok(None) => {
                debug_fmt!("BackendResolver", "Player config carries no '{}'", LEDGE_URL_FIELD);
                return Resolution::FieldAbsent;
            }
            Err(e) => {
                warn_fmt!("BackendResolver", "Player config is not valid JSON, skipping resolution: {}", e);
                return Resolution::Malformed(e.to_string());
            }
        };

        if let Err(e) = reqwest::Url::parse(&url) {
            warn_fmt!("BackendResolver", "Ignoring ledge URL '{}': {}", url, e);
            return Resolution::InvalidUrl(url);
        }

        self.set(url.clone());
        info_fmt!("BackendResolver", "Ledge backend resolved to {}", url);
        Resolution::Resolved(url)
    }
}

/// Pull the ledge URL out of a player-config document.
///
/// String values are taken as-is; any other non-null value is used in its
/// JSON text form.
pub fn extract_ledge_url(body: &str) -> Result<Option<String>, serde_json::Error> {
    let document: Value = serde_json::from_str(body)?;

    Ok(match document.get(LEDGE_URL_FIELD) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    })
}
