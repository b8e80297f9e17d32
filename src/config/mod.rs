// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Configuration subsystem
//!
//! A running proxy reads its settings from an ordered list of
//! [`ConfigProvider`]s. Later providers override earlier ones, and object
//! values are merged key by key, so an environment variable can replace one
//! field of a section that otherwise comes from a file:
//!
//! 1. `FileConfigProvider`   – `league-proxy.{toml,json,yaml}`
//! 2. `EnvConfigProvider`    – `LEAGUE_PROXY_SERVER__CONFIG_PORT=29150`
//! 3. `MemoryConfigProvider` – values supplied by embedding code
//!
//! | key | type | default | description |
//! |-----|------|---------|-------------|
//! | `server.host`             | string  | `127.0.0.1` | Address both listeners bind to |
//! | `server.config_port`      | u16     | `29150` | Config listener port |
//! | `server.ledge_port`       | u16     | `29151` | Ledge listener port |
//! | `server.body_limit`       | bytes   | 16 MiB  | Maximum inbound body size |
//! | `server.shutdown_timeout` | seconds | `10`    | Connection drain limit |
//! | `upstream.config_url`     | string  | `https://clientconfig.rpg.riotgames.com` | Config service |
//! | `upstream.timeout`        | seconds | –       | Upstream request timeout |
//! | `proxy.logging`           | object  | –       | See `logging::config::LoggingConfig` |
//! | `launcher`                | object  | –       | See `launcher::LauncherConfig` |

mod env;
pub mod error;
mod file;
mod memory;


pub use env::EnvConfigProvider;
pub use error::ConfigError;
pub use file::FileConfigProvider;
pub use memory::MemoryConfigProvider;

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt::Debug;
use std::sync::Arc;

/// A source of configuration values.
pub trait ConfigProvider: Debug + Send + Sync {
    /// Whether the provider has a value for `key` (dot-separated path).
    fn has(&self, key: &str) -> bool;

    /// Name used in error messages.
    fn provider_name(&self) -> &str;

    /// Raw value for `key`, left as JSON for later deserialization.
    fn get_raw(&self, key: &str) -> Result<Option<Value>, ConfigError>;
}

/// Typed access for a single provider.
pub trait ConfigProviderExt: ConfigProvider {
    /// Get a value and deserialize it.
    fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        match self.get_raw(key)? {
            Some(value) => deserialize(key, value).map(Some),
            None => Ok(None),
        }
    }
}

impl<T: ConfigProvider> ConfigProviderExt for T {}

fn deserialize<T: DeserializeOwned>(key: &str, value: Value) -> Result<T, ConfigError> {
    serde_json::from_value(value)
        .map_err(|e| ConfigError::ParseError(format!("failed to deserialize '{key}': {e}")))
}

/// Look up a dot-separated path inside a JSON tree.
pub(crate) fn lookup_path<'a>(root: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(root, |node, segment| match node {
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => node.get(segment),
        })
}

/// Merge `overlay` into `base`; objects merge recursively, anything else
/// is replaced.
pub(crate) fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Builder for [`Config`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    providers: Vec<Arc<dyn ConfigProvider>>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider; it overrides every provider added before it.
    pub fn with_provider<P: ConfigProvider + 'static>(mut self, provider: P) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    /// Add a shared provider.
    pub fn with_shared_provider(mut self, provider: Arc<dyn ConfigProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn build(self) -> Config {
        Config {
            providers: self.providers,
        }
    }
}

/// Layered configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    providers: Vec<Arc<dyn ConfigProvider>>,
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Builder seeded with this configuration's providers, for layering
    /// more on top.
    pub fn to_builder(&self) -> ConfigBuilder {
        ConfigBuilder {
            providers: self.providers.clone(),
        }
    }

    /// Names of the providers, lowest priority first.
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.provider_name()).collect()
    }

    fn get_raw(&self, key: &str) -> Result<Option<Value>, ConfigError> {
        let mut merged: Option<Value> = None;

        for provider in &self.providers {
            if !provider.has(key) {
                continue;
            }
            if let Some(value) = provider.get_raw(key)? {
                match merged.as_mut() {
                    Some(base) => merge_values(base, value),
                    None => merged = Some(value),
                }
            }
        }

        Ok(merged)
    }

    /// Get a value by key, merged across every provider that has it.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        match self.get_raw(key)? {
            Some(value) => deserialize(key, value).map(Some),
            None => Ok(None),
        }
    }

    /// Get a value by key, falling back to `default` when no provider has it.
    pub fn get_or_default<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T, ConfigError> {
        Ok(self.get(key)?.unwrap_or(default))
    }

    /// Configuration backed by a single file.
    pub fn from_file(file_path: &str) -> Result<Self, ConfigError> {
        let provider = FileConfigProvider::new(file_path)?;
        Ok(Self::builder().with_provider(provider).build())
    }
}
