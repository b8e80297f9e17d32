// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Header forwarding policy.
//!
//! Upstream calls never inherit the client's headers wholesale. Each
//! endpoint names the headers that may cross; they are copied verbatim and
//! everything else is dropped. `Accept: application/json` is always set on
//! the outbound map.


use hyper::header::{self, HeaderMap, HeaderName, HeaderValue};
use hyper::Method;

/// Entitlements token sent by the client to the config service.
pub const X_RIOT_ENTITLEMENTS_JWT: &str = "x-riot-entitlements-jwt";
/// Identity token sent by the client to the config service.
pub const X_RIOT_RSO_IDENTITY_JWT: &str = "x-riot-rso-identity-jwt";
/// W3C baggage header.
pub const BAGGAGE: &str = "baggage";
/// W3C trace context header.
pub const TRACEPARENT: &str = "traceparent";

const CONFIG_ALLOW_LIST: &[&str] = &[
    "user-agent",
    X_RIOT_ENTITLEMENTS_JWT,
    "authorization",
    X_RIOT_RSO_IDENTITY_JWT,
    BAGGAGE,
    TRACEPARENT,
];

const LEDGE_READ_ALLOW_LIST: &[&str] = &["accept-encoding", "user-agent", "authorization"];

const LEDGE_WRITE_ALLOW_LIST: &[&str] = &[
    "user-agent",
    "authorization",
    "content-encoding",
    "content-type",
    "content-length",
];

/// Which upstream call the outbound headers are built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderPolicy {
    /// Calls to the fixed config host
    Config,
    /// Ledge GET
    LedgeRead,
    /// Ledge POST/PUT
    LedgeWrite,
}

impl HeaderPolicy {
    /// Policy for a ledge call with the given verb.
    pub fn for_ledge(method: &Method) -> Self {
        if *method == Method::POST || *method == Method::PUT {
            HeaderPolicy::LedgeWrite
        } else {
            HeaderPolicy::LedgeRead
        }
    }

    /// Header names this policy lets through.
    pub fn allow_list(&self) -> &'static [&'static str] {
        match self {
            HeaderPolicy::Config => CONFIG_ALLOW_LIST,
            HeaderPolicy::LedgeRead => LEDGE_READ_ALLOW_LIST,
            HeaderPolicy::LedgeWrite => LEDGE_WRITE_ALLOW_LIST,
        }
    }

    /// Whether `name` is on this policy's allow-list (case-insensitive).
    pub fn allows(&self, name: &str) -> bool {
        self.allow_list()
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(name))
    }

    /// Build the outbound header set from the client's headers.
    pub fn build(&self, inbound: &HeaderMap) -> HeaderMap {
        let mut outbound = HeaderMap::new();

        for name in self.allow_list() {
            let name = HeaderName::from_static(name);
            for value in inbound.get_all(&name) {
                outbound.append(name.clone(), value.clone());
            }
        }

        outbound.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        outbound
    }
}
