// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP listeners.
//!
//! A [`ProxyServer`] is a thin wrapper around **hyper-util**: it owns one
//! listening socket, turns each request into an [`InboundRequest`] for its
//! [`Relay`] and maps relay errors onto status codes. The proxy runs two of
//! them, one per relay.
//!
//! **Protocol support**
//! Uses `hyper_util::server::conn::auto::Builder`, so a connection may speak
//! HTTP/1.1 or HTTP/2.
//!
//! **Body limit**
//! Inbound bodies are collected up to `server.body_limit` bytes before the
//! relay sees them. Larger bodies end the request with `400`.


use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use http_body_util::{BodyExt, Limited};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as AutoBuilder;
use serde::{Deserialize, Serialize};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::core::{InboundRequest, ProxyError, Relay, RelayBody, RelayResponse};
use crate::logging::middleware::RequestLogger;
use crate::{debug_fmt, error_fmt, info_fmt, warn_fmt};

/// Default config listener port.
pub const DEFAULT_CONFIG_PORT: u16 = 29150;

/// Default ledge listener port.
pub const DEFAULT_LEDGE_PORT: u16 = 29151;

/// Listener settings (`server.*`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host both listeners bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port of the config listener
    #[serde(default = "default_config_port")]
    pub config_port: u16,

    /// Port of the ledge listener
    #[serde(default = "default_ledge_port")]
    pub ledge_port: u16,

    /// Maximum inbound body size in bytes
    #[serde(default = "default_body_limit")]
    pub body_limit: usize,

    /// Seconds to wait for open connections when stopping
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_config_port() -> u16 {
    DEFAULT_CONFIG_PORT
}

fn default_ledge_port() -> u16 {
    DEFAULT_LEDGE_PORT
}

fn default_body_limit() -> usize {
    16 * 1024 * 1024
}

fn default_shutdown_timeout() -> u64 {
    10
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            config_port: default_config_port(),
            ledge_port: default_ledge_port(),
            body_limit: default_body_limit(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

impl ServerConfig {
    /// Socket address of the config listener.
    pub fn config_addr(&self) -> Result<SocketAddr, ProxyError> {
        self.addr(self.config_port)
    }

    /// Socket address of the ledge listener.
    pub fn ledge_addr(&self) -> Result<SocketAddr, ProxyError> {
        self.addr(self.ledge_port)
    }

    fn addr(&self, port: u16) -> Result<SocketAddr, ProxyError> {
        format!("{}:{}", self.host, port)
            .parse::<SocketAddr>()
            .map_err(|e| ProxyError::ConfigError(format!("invalid server address '{}': {}", self.host, e)))
    }
}

/// One bound listener serving one relay.
#[derive(Debug)]
pub struct ProxyServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    relay: Arc<dyn Relay>,
    logger: Arc<RequestLogger>,
    body_limit: usize,
    shutdown_timeout: Duration,
}

impl ProxyServer {
    /// Bind `addr`. Port `0` lets the OS choose; see [`local_addr`](Self::local_addr).
    pub async fn bind(
        addr: SocketAddr,
        relay: Arc<dyn Relay>,
        config: &ServerConfig,
        logger: RequestLogger,
    ) -> Result<Self, ProxyError> {
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            ProxyError::Other(format!("failed to bind {} listener on {}: {}", relay.name(), addr, e))
        })?;
        let local_addr = listener.local_addr()?;

        info_fmt!("Server", "{} listener bound to http://{}", relay.name(), local_addr);

        Ok(Self {
            listener,
            local_addr,
            relay,
            logger: Arc::new(logger),
            body_limit: config.body_limit,
            shutdown_timeout: Duration::from_secs(config.shutdown_timeout),
        })
    }

    /// Address actually bound.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Base URL clients use to reach this listener.
    pub fn url(&self) -> String {
        format!("http://{}", self.local_addr)
    }

    /// Accept connections until `shutdown` flips to `true` (or its sender
    /// is dropped), then drain open connections.
    pub async fn serve(self, mut shutdown: watch::Receiver<bool>) -> Result<(), ProxyError> {
        let name = self.relay.name().to_string();
        let mut connections = JoinSet::new();

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info_fmt!("Server", "{} listener received shutdown signal", name);
                        break;
                    }
                }
                accept = self.listener.accept() => {
                    match accept {
                        Ok((stream, remote_addr)) => {
                            connections.spawn(serve_connection(
                                stream,
                                remote_addr,
                                self.relay.clone(),
                                self.logger.clone(),
                                self.body_limit,
                                shutdown.clone(),
                            ));
                        }
                        Err(e) => error_fmt!("Server", "{} accept error: {}", name, e),
                    }
                }
            }

            while connections.try_join_next().is_some() {}
        }

        drop(self.listener);
        info_fmt!("Server", "{} listener closed; draining {} connection(s)", name, connections.len());

        let drain = async {
            while let Some(res) = connections.join_next().await {
                if let Err(e) = res {
                    if !e.is_cancelled() {
                        error_fmt!("Server", "{} connection task failed: {}", name, e);
                    }
                }
            }
        };

        if tokio::time::timeout(self.shutdown_timeout, drain).await.is_err() {
            warn_fmt!(
                "Server",
                "{} shutdown timed out after {}s, aborting remaining connections",
                name,
                self.shutdown_timeout.as_secs()
            );
            connections.shutdown().await;
        }

        info_fmt!("Server", "{} listener stopped", name);
        Ok(())
    }
}

async fn serve_connection(
    stream: TcpStream,
    remote_addr: SocketAddr,
    relay: Arc<dyn Relay>,
    logger: Arc<RequestLogger>,
    body_limit: usize,
    mut shutdown: watch::Receiver<bool>,
) {
    let service = service_fn(move |req: Request<Incoming>| {
        handle_request(req, relay.clone(), logger.clone(), body_limit, remote_addr)
    });

    let builder = {
        let mut b = AutoBuilder::new(TokioExecutor::new());
        b.http1();
        b.http2();
        b
    };

    let connection = builder.serve_connection(TokioIo::new(stream), service);
    let mut conn = std::pin::pin!(connection);

    tokio::select! {
        res = conn.as_mut() => log_connection_end(res),
        _ = async { let _ = shutdown.wait_for(|stop| *stop).await; } => {
            conn.as_mut().graceful_shutdown();
            log_connection_end(conn.await);
        }
    }
}

fn log_connection_end(res: Result<(), Box<dyn std::error::Error + Send + Sync>>) {
    match res {
        Ok(()) => debug_fmt!("Server", "Connection closed"),
        Err(e) => {
            let msg = e.to_string();
            if !msg.contains("connection closed") && !msg.contains("connection reset") {
                error_fmt!("Server", "Connection error: {}", e);
            }
        }
    }
}

/// Collect the inbound body into an [`InboundRequest`].
async fn convert_hyper_request(
    req: Request<Incoming>,
    body_limit: usize,
    remote_addr: SocketAddr,
) -> Result<InboundRequest, ProxyError> {
    let (parts, body) = req.into_parts();

    let body = Limited::new(body, body_limit)
        .collect()
        .await
        .map_err(|e| ProxyError::InvalidRequest(format!("failed to read request body: {e}")))?
        .to_bytes();

    Ok(InboundRequest {
        method: parts.method,
        path: parts.uri.path().to_string(),
        query: parts.uri.query().map(str::to_string),
        headers: parts.headers,
        body,
        client_ip: Some(remote_addr.ip().to_string()),
    })
}

/// Response sent when a relay fails.
pub fn error_response(err: &ProxyError) -> RelayResponse {
    let mut response = Response::new(RelayBody::from(err.client_message()));
    *response.status_mut() = err.status_code();
    response
}

async fn handle_request(
    req: Request<Incoming>,
    relay: Arc<dyn Relay>,
    logger: Arc<RequestLogger>,
    body_limit: usize,
    remote_addr: SocketAddr,
) -> Result<RelayResponse, Infallible> {
    let info = logger.begin(req.method(), req.uri().path(), req.headers(), Some(remote_addr));

    let result = match convert_hyper_request(req, body_limit, remote_addr).await {
        Ok(inbound) => relay.relay(inbound).await,
        Err(e) => Err(e),
    };

    let mut response = match result {
        Ok(response) => response,
        Err(e) => {
            if e.status_code().is_server_error() {
                error_fmt!("Server", "{} {} {} failed: {}", relay.name(), info.method, info.path, e);
            } else {
                warn_fmt!("Server", "{} {} {} rejected: {}", relay.name(), info.method, info.path, e);
            }
            error_response(&e)
        }
    };

    logger.finish(&mut response, &info);
    Ok(response)
}

/// Resolve on Ctrl-C or, on Unix, SIGTERM.
pub async fn wait_for_signal() -> Result<(), ProxyError> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate())
            .map_err(|e| ProxyError::Other(format!("cannot install SIGTERM handler: {e}")))?;

        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                res?;
                info_fmt!("Server", "Received Ctrl-C");
            }
            _ = term.recv() => info_fmt!("Server", "Received SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info_fmt!("Server", "Received Ctrl-C");
    }

    Ok(())
}
