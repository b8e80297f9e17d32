// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory configuration provider.

use serde_json::Value;

use super::{ConfigError, ConfigProvider, lookup_path, merge_values};

/// Serves values from a JSON tree held in memory.
#[derive(Debug, Clone)]
pub struct MemoryConfigProvider {
    name: String,
    data: Value,
}

impl MemoryConfigProvider {
    /// Wrap a JSON object.
    pub fn new(data: Value) -> Self {
        Self {
            name: "memory".to_string(),
            data,
        }
    }

    /// Rename the provider for error messages.
    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Set a dot-separated key, creating intermediate objects.
    pub fn with_value(mut self, key: &str, value: Value) -> Self {
        let overlay = key
            .rsplit('.')
            .fold(value, |inner, segment| {
                let mut map = serde_json::Map::new();
                map.insert(segment.to_string(), inner);
                Value::Object(map)
            });
        merge_values(&mut self.data, overlay);
        self
    }
}

impl Default for MemoryConfigProvider {
    fn default() -> Self {
        Self::new(Value::Object(serde_json::Map::new()))
    }
}

impl ConfigProvider for MemoryConfigProvider {
    fn has(&self, key: &str) -> bool {
        lookup_path(&self.data, key).is_some()
    }

    fn provider_name(&self) -> &str {
        &self.name
    }

    fn get_raw(&self, key: &str) -> Result<Option<Value>, ConfigError> {
        Ok(lookup_path(&self.data, key).cloned())
    }
}
