// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Environment variable configuration provider.
//!
//! `LEAGUE_PROXY_SERVER__CONFIG_PORT=29150` becomes `server.config_port`:
//! the prefix is stripped, the rest is lower-cased and `__` separates path
//! segments. Single underscores stay part of the key.

use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::env;

use super::{ConfigError, ConfigProvider, lookup_path, merge_values};

/// Default variable prefix.
pub const DEFAULT_ENV_PREFIX: &str = "LEAGUE_PROXY_";

/// Reads prefixed environment variables once, at construction.
#[derive(Debug)]
pub struct EnvConfigProvider {
    prefix: String,
    tree: Value,
}

impl EnvConfigProvider {
    pub fn new(prefix: &str) -> Self {
        Self::from_vars(prefix, env::vars())
    }

    /// Build from an explicit variable list instead of the process env.
    pub fn from_vars<I>(prefix: &str, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut flat = BTreeMap::new();
        for (key, value) in vars {
            if let Some(rest) = key.strip_prefix(prefix) {
                if rest.is_empty() {
                    continue;
                }
                flat.insert(rest.to_lowercase().replace("__", "."), parse_value(&value));
            }
        }

        let mut tree = Value::Object(serde_json::Map::new());
        for (key, value) in flat {
            merge_values(&mut tree, nest(&key, value));
        }

        Self {
            prefix: prefix.to_string(),
            tree,
        }
    }

    /// Prefix this provider reads.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Default for EnvConfigProvider {
    fn default() -> Self {
        Self::new(DEFAULT_ENV_PREFIX)
    }
}

/// Values are JSON when they parse as JSON, strings otherwise.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| json!(raw))
}

/// Nest `value` under a dot-separated key.
fn nest(key: &str, value: Value) -> Value {
    key.rsplit('.').fold(value, |inner, segment| {
        let mut map = serde_json::Map::new();
        map.insert(segment.to_string(), inner);
        Value::Object(map)
    })
}

impl ConfigProvider for EnvConfigProvider {
    fn has(&self, key: &str) -> bool {
        lookup_path(&self.tree, key).is_some()
    }

    fn provider_name(&self) -> &str {
        "env"
    }

    fn get_raw(&self, key: &str) -> Result<Option<Value>, ConfigError> {
        Ok(lookup_path(&self.tree, key).cloned())
    }
}
