// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! league-proxy - a local intercepting proxy for the game client's config
//! and ledge backends.
//!
//! The client is started with `--client-config-url` pointing at the local
//! config listener. Config responses are relayed from the real config
//! service, optionally rewritten, and the player config tells the proxy
//! where the ledge backend lives. Requests on the ledge listener are then
//! forwarded there.
//!
//! # Components
//!
//! - **Relays**: [`ConfigRelay`] and [`LedgeRelay`], one per listener.
//! - **Header allow-lists**: [`HeaderPolicy`] decides which inbound headers
//!   reach upstream.
//! - **Backend resolution**: [`BackendResolver`] holds the ledge base URL
//!   learned from the player config.
//! - **Content hooks**: ordered rewrites of response bodies, registered per
//!   [`HookPoint`].
//! - **Configuration**: layered file / environment / in-memory providers.
//!
//! # Content hooks
//!
//! ```rust,no_run
//! use league_proxy::{HookPoint, LeagueProxy};
//!
//! # async fn run() -> Result<(), league_proxy::LoaderError> {
//! let proxy = LeagueProxy::loader()
//!     .with_env_vars()
//!     .with_hook_fn(HookPoint::ConfigPlayer, "enable-feature", |body, _request| {
//!         body.replace("\"feature.enabled\":false", "\"feature.enabled\":true")
//!     })
//!     .build()?;
//!
//! proxy.start_and_launch(&[]).await?;
//! proxy.run_until_signal().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod headers;
pub mod hooks;
pub mod launcher;
pub mod loader;
pub mod logging;
pub mod relay;
pub mod resolver;
pub mod server;

pub use config::{Config, ConfigError, ConfigProvider, ConfigProviderExt};
pub use core::{InboundRequest, ProxyError, Relay, RelayBody, RelayResponse};
pub use headers::HeaderPolicy;
pub use hooks::{ContentHook, ContentHookChain, HookPoint, HookRegistry, hook_fn};
pub use launcher::{ClientLauncher, LauncherConfig, LauncherError};
pub use loader::{LeagueProxy, LeagueProxyLoader, LoaderError, ProxyUrls};
pub use relay::{ConfigRelay, LedgeRelay, Upstream, UpstreamConfig};
pub use resolver::BackendResolver;
pub use server::{ProxyServer, ServerConfig};
