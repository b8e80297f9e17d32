// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! High-level entry-point.
//!
//! [`LeagueProxyLoader`] gathers configuration and hooks, then builds a
//! [`LeagueProxy`] holding the shared HTTP client, the backend resolver and
//! both relays. Starting the proxy binds the two listeners; stopping it
//! drains them.


use std::env;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::process::Child;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::{Config, ConfigError, ConfigProvider, EnvConfigProvider, FileConfigProvider};
use crate::core::{InboundRequest, ProxyError};
use crate::hooks::{ContentHook, HookPoint, HookRegistry, hook_fn};
use crate::launcher::{ClientLauncher, LauncherConfig, LauncherError};
use crate::logging::config::LoggingConfig;
use crate::logging::middleware::RequestLogger;
use crate::logging::{init_with_config, log_error, log_info, parse_level};
use crate::relay::{ConfigRelay, LedgeRelay, Upstream, UpstreamConfig};
use crate::resolver::BackendResolver;
use crate::server::{ProxyServer, ServerConfig, wait_for_signal};
use crate::{info_fmt, warn_fmt};

/// Errors raised while building or driving the proxy.
#[derive(Error, Debug)]
pub enum LoaderError {
    /// `start` was called on a running proxy
    #[error("proxy is already running")]
    AlreadyRunning,

    /// The operation needs running listeners
    #[error("proxy is not running")]
    NotRunning,

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigError(#[from] ConfigError),

    /// Proxy error
    #[error("proxy error: {0}")]
    ProxyError(#[from] ProxyError),

    /// Client launch error
    #[error("launcher error: {0}")]
    LauncherError(#[from] LauncherError),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Builder for a [`LeagueProxy`].
#[derive(Debug, Default)]
pub struct LeagueProxyLoader {
    config: Option<Config>,
    config_file_path: Option<String>,
    use_env_vars: bool,
    env_prefix: Option<String>,
    providers: Vec<Arc<dyn ConfigProvider>>,
    hooks: HookRegistry,
}

impl LeagueProxyLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration. File, env and custom providers
    /// are layered on top of it.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Read a JSON, TOML or YAML file.
    pub fn with_config_file(mut self, file_path: &str) -> Self {
        self.config_file_path = Some(file_path.to_string());
        self
    }

    /// Read `LEAGUE_PROXY_*` environment variables.
    pub fn with_env_vars(mut self) -> Self {
        self.use_env_vars = true;
        self
    }

    /// Read environment variables with a custom prefix.
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_string());
        self.use_env_vars = true;
        self
    }

    /// Add a provider; it overrides file and environment values.
    pub fn with_provider<P: ConfigProvider + 'static>(mut self, provider: P) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    /// Register a content hook.
    pub fn with_hook(mut self, point: HookPoint, hook: Arc<dyn ContentHook>) -> Self {
        self.hooks.register(point, hook);
        self
    }

    /// Register a closure as a content hook.
    pub fn with_hook_fn<F>(self, point: HookPoint, name: &str, f: F) -> Self
    where
        F: Fn(String, &InboundRequest) -> String + Send + Sync + 'static,
    {
        self.with_hook(point, hook_fn(name, f))
    }

    fn build_config(&mut self) -> Result<Config, LoaderError> {
        let mut builder = match self.config.take() {
            Some(config) => config.to_builder(),
            None => Config::builder(),
        };

        if let Some(path) = &self.config_file_path {
            builder = builder.with_provider(FileConfigProvider::new(path)?);
        }

        if self.use_env_vars {
            builder = builder.with_provider(match &self.env_prefix {
                Some(prefix) => EnvConfigProvider::new(prefix),
                None => EnvConfigProvider::default(),
            });
        }

        for provider in self.providers.drain(..) {
            builder = builder.with_shared_provider(provider);
        }

        Ok(builder.build())
    }

    /// Initialize logging and wire up the relays.
    pub fn build(mut self) -> Result<LeagueProxy, LoaderError> {
        let config = self.build_config()?;

        let log_level = parse_level(env::var("RUST_LOG_LEVEL").ok().as_deref());
        let logging_config = match config.get::<LoggingConfig>("proxy.logging") {
            Ok(Some(logging_config)) => {
                init_with_config(Some(log_level), Some(logging_config.clone()));
                logging_config
            }
            Ok(None) => {
                init_with_config(Some(log_level), None);
                log_info("Startup", "Logging configuration not found. Using default settings.");
                LoggingConfig::default()
            }
            Err(e) => {
                init_with_config(Some(log_level), None);
                return Err(log_error("Startup", LoaderError::ConfigError(e)));
            }
        };

        let server_config: ServerConfig = config.get_or_default("server", ServerConfig::default())?;
        let upstream_config: UpstreamConfig = config.get_or_default("upstream", UpstreamConfig::default())?;
        let launcher_config: LauncherConfig = config.get_or_default("launcher", LauncherConfig::default())?;

        let upstream = Upstream::new(&upstream_config)?;
        let resolver = Arc::new(BackendResolver::new());
        let hooks = Arc::new(self.hooks);

        for point in [HookPoint::ConfigPublic, HookPoint::ConfigPlayer, HookPoint::Ledge] {
            let names = hooks.chain(point).names();
            if !names.is_empty() {
                info_fmt!("Startup", "{} hooks: {}", point, names.join(", "));
            }
        }

        let config_relay = Arc::new(ConfigRelay::new(
            upstream.clone(),
            upstream_config.config_url.clone(),
            resolver.clone(),
            hooks.clone(),
        ));
        let ledge_relay = Arc::new(LedgeRelay::new(upstream, resolver.clone(), hooks));

        info_fmt!("Startup", "Config upstream is {}", upstream_config.config_url);

        Ok(LeagueProxy {
            config: Arc::new(config),
            server_config,
            logging_config,
            launcher: ClientLauncher::new(launcher_config),
            resolver,
            config_relay,
            ledge_relay,
            state: Mutex::new(None),
        })
    }
}

/// Base URLs of the two bound listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyUrls {
    pub config: String,
    pub ledge: String,
}

#[derive(Debug)]
struct Running {
    urls: ProxyUrls,
    shutdown: watch::Sender<bool>,
    servers: Vec<JoinHandle<Result<(), ProxyError>>>,
}

/// A configured proxy.
#[derive(Debug)]
pub struct LeagueProxy {
    config: Arc<Config>,
    server_config: ServerConfig,
    logging_config: LoggingConfig,
    launcher: ClientLauncher,
    resolver: Arc<BackendResolver>,
    config_relay: Arc<ConfigRelay>,
    ledge_relay: Arc<LedgeRelay>,
    state: Mutex<Option<Running>>,
}

impl LeagueProxy {
    pub fn loader() -> LeagueProxyLoader {
        LeagueProxyLoader::new()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolver shared by both relays.
    pub fn resolver(&self) -> &Arc<BackendResolver> {
        &self.resolver
    }

    pub fn launcher(&self) -> &ClientLauncher {
        &self.launcher
    }

    /// Listener URLs while running.
    pub fn urls(&self) -> Option<ProxyUrls> {
        self.state().as_ref().map(|running| running.urls.clone())
    }

    pub fn is_running(&self) -> bool {
        self.state().is_some()
    }

    fn state(&self) -> MutexGuard<'_, Option<Running>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Bind both listeners and serve them in the background.
    pub async fn start(&self) -> Result<ProxyUrls, LoaderError> {
        if self.is_running() {
            return Err(LoaderError::AlreadyRunning);
        }

        let config_server = ProxyServer::bind(
            self.server_config.config_addr()?,
            self.config_relay.clone(),
            &self.server_config,
            RequestLogger::new("config", self.logging_config.clone()),
        )
        .await?;
        let ledge_server = ProxyServer::bind(
            self.server_config.ledge_addr()?,
            self.ledge_relay.clone(),
            &self.server_config,
            RequestLogger::new("ledge", self.logging_config.clone()),
        )
        .await?;

        let urls = ProxyUrls {
            config: config_server.url(),
            ledge: ledge_server.url(),
        };

        let mut state = self.state();
        if state.is_some() {
            return Err(LoaderError::AlreadyRunning);
        }

        let (shutdown, rx) = watch::channel(false);
        let servers = vec![
            tokio::spawn(config_server.serve(rx.clone())),
            tokio::spawn(ledge_server.serve(rx)),
        ];

        info_fmt!("LeagueProxy", "Config proxy at {}, ledge proxy at {}", urls.config, urls.ledge);

        *state = Some(Running {
            urls: urls.clone(),
            shutdown,
            servers,
        });
        Ok(urls)
    }

    /// Stop both listeners and wait for them to drain.
    pub async fn stop(&self) -> Result<(), LoaderError> {
        let running = self.state().take().ok_or(LoaderError::NotRunning)?;

        info_fmt!("LeagueProxy", "Stopping");
        let _ = running.shutdown.send(true);

        let mut first_error = None;
        for server in running.servers {
            let outcome = match server.await {
                Ok(result) => result.map_err(LoaderError::from),
                Err(e) => Err(LoaderError::Other(format!("listener task failed: {e}"))),
            };
            if let Err(e) = outcome {
                warn_fmt!("LeagueProxy", "{}", e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Start the game client against the running config listener,
    /// stopping running clients first when `launcher.terminate_running` is
    /// set.
    pub async fn launch_client(&self, extra_args: &[String]) -> Result<Child, LoaderError> {
        let config_url = self
            .urls()
            .map(|urls| urls.config)
            .ok_or(LoaderError::NotRunning)?;

        if self.launcher.config().terminate_running {
            self.launcher.terminate_running().await;
        }

        Ok(self.launcher.launch(&config_url, extra_args)?)
    }

    /// [`start`](Self::start) then [`launch_client`](Self::launch_client).
    pub async fn start_and_launch(&self, extra_args: &[String]) -> Result<(ProxyUrls, Child), LoaderError> {
        let urls = self.start().await?;
        match self.launch_client(extra_args).await {
            Ok(child) => Ok((urls, child)),
            Err(e) => {
                let _ = self.stop().await;
                Err(e)
            }
        }
    }

    /// Wait for Ctrl-C or SIGTERM, then stop.
    pub async fn run_until_signal(&self) -> Result<(), LoaderError> {
        if !self.is_running() {
            return Err(LoaderError::NotRunning);
        }
        wait_for_signal().await?;
        self.stop().await
    }
}
