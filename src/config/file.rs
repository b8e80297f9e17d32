// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! File-based configuration provider.

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use super::{ConfigError, ConfigProvider, lookup_path};

/// Supported file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Toml,
    Yaml,
}

impl FileFormat {
    /// Detect the format from the file extension.
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        match ext.as_str() {
            "json" => Some(FileFormat::Json),
            "toml" => Some(FileFormat::Toml),
            "yaml" | "yml" => Some(FileFormat::Yaml),
            _ => None,
        }
    }

    fn parse(self, content: &str) -> Result<Value, ConfigError> {
        match self {
            FileFormat::Json => serde_json::from_str(content).map_err(|e| invalid("JSON", e)),
            FileFormat::Toml => {
                let value: toml::Value = toml::from_str(content).map_err(|e| invalid("TOML", e))?;
                serde_json::to_value(value).map_err(|e| invalid("TOML", e))
            }
            FileFormat::Yaml => {
                let value: serde_yaml::Value =
                    serde_yaml::from_str(content).map_err(|e| invalid("YAML", e))?;
                serde_json::to_value(value).map_err(|e| invalid("YAML", e))
            }
        }
    }
}

fn invalid(kind: &str, e: impl std::fmt::Display) -> ConfigError {
    ConfigError::provider_error("file", format!("invalid {kind}: {e}"))
}

/// Reads one JSON, TOML or YAML file at construction time.
#[derive(Debug)]
pub struct FileConfigProvider {
    path: PathBuf,
    data: Value,
}

impl FileConfigProvider {
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        let path = PathBuf::from(path);
        let format = FileFormat::from_extension(&path)
            .ok_or_else(|| ConfigError::provider_error("file", "unsupported file format"))?;

        let content = fs::read_to_string(&path).map_err(|e| {
            ConfigError::provider_error("file", format!("failed to read {}: {e}", path.display()))
        })?;

        let data = format.parse(&content)?;
        if !data.is_object() {
            return Err(ConfigError::provider_error(
                "file",
                "root configuration must be an object",
            ));
        }

        Ok(Self { path, data })
    }

    /// Path the configuration was read from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigProvider for FileConfigProvider {
    fn has(&self, key: &str) -> bool {
        lookup_path(&self.data, key).is_some()
    }

    fn provider_name(&self) -> &str {
        "file"
    }

    fn get_raw(&self, key: &str) -> Result<Option<Value>, ConfigError> {
        Ok(lookup_path(&self.data, key).cloned())
    }
}
