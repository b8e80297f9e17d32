// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Content hooks
//!
//! A hook rewrites a response body on its way back to the client, e.g. to
//! flip a flag inside the player config. Hooks are attached to one of three
//! [`HookPoint`]s and run in registration order, each receiving the output of
//! the previous one.
//!
//! ```rust
//! use league_proxy::hooks::{hook_fn, HookPoint, HookRegistry};
//!
//! let mut hooks = HookRegistry::new();
//! hooks.register(
//!     HookPoint::ConfigPlayer,
//!     hook_fn("enable-arena", |body, _request| body.replace("\"arena\":false", "\"arena\":true")),
//! );
//! assert_eq!(hooks.chain(HookPoint::ConfigPlayer).len(), 1);
//! ```
//!
//! Registration needs `&mut HookRegistry`; once the registry is handed to
//! the relays it sits behind an `Arc` and can no longer change.

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::core::{InboundRequest, ProxyError};
use crate::{trace_fmt, warn_fmt};

/// Where in the pipeline a hook runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPoint {
    /// `/api/v1/config/public` responses
    ConfigPublic,
    /// `/api/v1/config/player` responses
    ConfigPlayer,
    /// Ledge responses
    Ledge,
}

impl fmt::Display for HookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookPoint::ConfigPublic => write!(f, "config-public"),
            HookPoint::ConfigPlayer => write!(f, "config-player"),
            HookPoint::Ledge => write!(f, "ledge"),
        }
    }
}

/// A response body rewriter.
#[async_trait]
pub trait ContentHook: fmt::Debug + Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Produce the new body. `request` is the client request that caused
    /// the upstream call.
    async fn process(&self, body: String, request: &InboundRequest) -> Result<String, ProxyError>;
}

/// Adapter that turns a plain closure into a [`ContentHook`].
pub struct FnHook<F> {
    name: String,
    f: F,
}

impl<F> fmt::Debug for FnHook<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHook").field("name", &self.name).finish()
    }
}

#[async_trait]
impl<F> ContentHook for FnHook<F>
where
    F: Fn(String, &InboundRequest) -> String + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(&self, body: String, request: &InboundRequest) -> Result<String, ProxyError> {
        Ok((self.f)(body, request))
    }
}

/// Wrap a closure as a named hook.
pub fn hook_fn<F>(name: &str, f: F) -> Arc<dyn ContentHook>
where
    F: Fn(String, &InboundRequest) -> String + Send + Sync + 'static,
{
    Arc::new(FnHook {
        name: name.to_string(),
        f,
    })
}

/// Ordered hooks for one [`HookPoint`].
#[derive(Debug, Default, Clone)]
pub struct ContentHookChain {
    hooks: Vec<Arc<dyn ContentHook>>,
}

impl ContentHookChain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a hook; it runs after every hook already registered.
    pub fn register(&mut self, hook: Arc<dyn ContentHook>) {
        self.hooks.push(hook);
    }

    /// Number of registered hooks.
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// True when no hook is registered.
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Names of the registered hooks in invocation order.
    pub fn names(&self) -> Vec<&str> {
        self.hooks.iter().map(|h| h.name()).collect()
    }

    /// Run every hook over `body` in order.
    ///
    /// A hook that errors is reported as a contract violation and skipped;
    /// the body it was given is passed on to the next hook.
    pub async fn invoke(&self, body: String, request: &InboundRequest) -> String {
        let mut current = body;

        for hook in &self.hooks {
            // Cloned so a failing hook leaves the previous body in place.
            match hook.process(current.clone(), request).await {
                Ok(next) => {
                    trace_fmt!("ContentHookChain", "Hook '{}' processed {} ({} -> {} bytes)",
                        hook.name(), request, current.len(), next.len());
                    current = next;
                }
                Err(e) => {
                    let violation = ProxyError::HookContractViolation {
                        hook: hook.name().to_string(),
                        reason: e.to_string(),
                    };
                    warn_fmt!("ContentHookChain", "{} while processing {}; hook skipped", violation, request);
                }
            }
        }

        current
    }
}

/// One hook chain per [`HookPoint`].
#[derive(Debug, Default, Clone)]
pub struct HookRegistry {
    chains: HashMap<HookPoint, ContentHookChain>,
    empty: ContentHookChain,
}

impl HookRegistry {
    /// Create a registry with no hooks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `hook` to the chain for `point`.
    pub fn register(&mut self, point: HookPoint, hook: Arc<dyn ContentHook>) {
        self.chains.entry(point).or_default().register(hook);
    }

    /// The chain for `point` (empty if nothing was registered).
    pub fn chain(&self, point: HookPoint) -> &ContentHookChain {
        self.chains.get(&point).unwrap_or(&self.empty)
    }

    /// Whether any hook is registered for `point`.
    pub fn has_hooks(&self, point: HookPoint) -> bool {
        !self.chain(point).is_empty()
    }

    /// Run the chain for `point` over `body`.
    pub async fn invoke(&self, point: HookPoint, body: String, request: &InboundRequest) -> String {
        self.chain(point).invoke(body, request).await
    }
}
