// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Starts the game client pointed at the local config listener.
//!
//! The client installer records its executables in `RiotClientInstalls.json`;
//! the first candidate that exists on disk is launched with
//! `--client-config-url` set to the proxy.


use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::{Child, Command};

use crate::{debug_fmt, info_fmt, warn_fmt};

/// Name of the installer's manifest file.
pub const INSTALLS_FILE_NAME: &str = "RiotClientInstalls.json";

/// Manifest keys tried in order.
pub const CLIENT_CANDIDATES: [&str; 3] = ["rc_default", "rc_live", "rc_beta"];

/// Errors raised while locating or starting the client.
#[derive(Error, Debug)]
pub enum LauncherError {
    /// No usable executable could be found
    #[error("client not found: {0}")]
    ClientNotFound(String),

    /// The process could not be started
    #[error("failed to spawn {path}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Launcher settings (`launcher.*`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LauncherConfig {
    /// Start the client once both listeners are up
    #[serde(default)]
    pub enabled: bool,

    /// Override the manifest location
    #[serde(default)]
    pub installs_file: Option<PathBuf>,

    #[serde(default = "default_product")]
    pub product: String,

    #[serde(default = "default_patchline")]
    pub patchline: String,

    /// Extra arguments appended after the defaults
    #[serde(default)]
    pub args: Vec<String>,

    /// Stop already running client processes before launching
    #[serde(default)]
    pub terminate_running: bool,

    /// Process names stopped when `terminate_running` is set
    #[serde(default = "default_terminate_processes")]
    pub terminate_processes: Vec<String>,
}

fn default_terminate_processes() -> Vec<String> {
    vec!["RiotClientServices".to_string(), "LeagueClient".to_string()]
}

fn default_product() -> String {
    "league_of_legends".to_string()
}

fn default_patchline() -> String {
    "live".to_string()
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            installs_file: None,
            product: default_product(),
            patchline: default_patchline(),
            args: Vec::new(),
            terminate_running: false,
            terminate_processes: default_terminate_processes(),
        }
    }
}

/// Platform location of the installer manifest.
pub fn default_installs_file() -> PathBuf {
    if cfg!(target_os = "macos") {
        PathBuf::from("/Users/Shared/Riot Games").join(INSTALLS_FILE_NAME)
    } else if cfg!(windows) {
        let program_data =
            std::env::var_os("ProgramData").unwrap_or_else(|| "C:\\ProgramData".into());
        PathBuf::from(program_data).join("Riot Games").join(INSTALLS_FILE_NAME)
    } else {
        PathBuf::from("/usr/share/Riot Games").join(INSTALLS_FILE_NAME)
    }
}

#[derive(Debug, Clone)]
pub struct ClientLauncher {
    config: LauncherConfig,
}

impl ClientLauncher {
    pub fn new(config: LauncherConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LauncherConfig {
        &self.config
    }

    /// Manifest path in effect.
    pub fn installs_file(&self) -> PathBuf {
        self.config
            .installs_file
            .clone()
            .unwrap_or_else(default_installs_file)
    }

    /// Find the client executable.
    pub fn locate(&self) -> Result<PathBuf, LauncherError> {
        let manifest = self.installs_file();
        let content = std::fs::read_to_string(&manifest).map_err(|e| {
            LauncherError::ClientNotFound(format!("cannot read {}: {}", manifest.display(), e))
        })?;
        let data: Value = serde_json::from_str(&content).map_err(|e| {
            LauncherError::ClientNotFound(format!("corrupt {}: {}", manifest.display(), e))
        })?;

        CLIENT_CANDIDATES
            .iter()
            .filter_map(|key| data.get(key).and_then(Value::as_str))
            .map(PathBuf::from)
            .find(|path| {
                let exists = path.is_file();
                debug_fmt!("Launcher", "Candidate {} exists: {}", path.display(), exists);
                exists
            })
            .ok_or_else(|| {
                LauncherError::ClientNotFound(format!(
                    "no installed client listed in {}",
                    manifest.display()
                ))
            })
    }

    /// Arguments passed to the client.
    pub fn command_args(&self, config_url: &str, extra: &[String]) -> Vec<String> {
        let mut args = vec![
            format!("--client-config-url={config_url}"),
            format!("--launch-product={}", self.config.product),
            format!("--launch-patchline={}", self.config.patchline),
        ];
        args.extend(self.config.args.iter().cloned());
        args.extend(extra.iter().cloned());
        args
    }

    /// Program and arguments that force-stop processes named `name`.
    pub fn terminate_command(name: &str) -> (&'static str, Vec<String>) {
        if cfg!(windows) {
            ("taskkill", vec!["/F".to_string(), "/IM".to_string(), format!("{name}.exe")])
        } else {
            ("pkill", vec!["-x".to_string(), name.to_string()])
        }
    }

    /// Stop every configured client process. Failures are logged, never
    /// returned; a process that is not running is not an error.
    pub async fn terminate_running(&self) {
        for name in &self.config.terminate_processes {
            let (program, args) = Self::terminate_command(name);
            match Command::new(program).args(&args).output().await {
                Ok(output) if output.status.success() => {
                    info_fmt!("Launcher", "Terminated running {}", name);
                }
                Ok(output) => {
                    // pkill exits 1 and taskkill 128 when nothing matched.
                    debug_fmt!("Launcher", "No running {} to terminate ({})", name, output.status);
                }
                Err(e) => warn_fmt!("Launcher", "Failed to run {} for {}: {}", program, name, e),
            }
        }
    }

    /// Start the client against `config_url`.
    pub fn launch(&self, config_url: &str, extra: &[String]) -> Result<Child, LauncherError> {
        let path = self.locate()?;
        self.spawn(&path, config_url, extra)
    }

    fn spawn(&self, path: &Path, config_url: &str, extra: &[String]) -> Result<Child, LauncherError> {
        let args = self.command_args(config_url, extra);
        info_fmt!("Launcher", "Starting {} {}", path.display(), args.join(" "));

        Command::new(path)
            .args(&args)
            .spawn()
            .map_err(|source| LauncherError::Spawn {
                path: path.to_path_buf(),
                source,
            })
    }
}
