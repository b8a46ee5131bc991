//! Caller address extraction.
//!
//! Behind a reverse proxy the socket peer is the proxy itself, so when
//! `trust_proxy` is on the first `X-Forwarded-For` entry (then `X-Real-IP`)
//! wins over the peer address in [`ClientIp`]. Those headers are set by the
//! caller, so anything that must not be evaded by rewriting them (rate
//! limits) keys on [`PeerIp`] instead.

use std::convert::Infallible;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{HeaderMap, request::Parts},
};

use crate::state::AppState;

/// Normalized caller address, `"unknown"` when none can be determined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl FromRequestParts<AppState> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        Ok(ClientIp(client_ip(
            &parts.headers,
            peer,
            state.config.trust_proxy,
        )))
    }
}

/// Normalized socket peer address, ignoring proxy headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerIp(pub String);

impl<S> FromRequestParts<S> for PeerIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        Ok(PeerIp(client_ip(&parts.headers, peer, false)))
    }
}

pub fn client_ip(headers: &HeaderMap, peer: Option<IpAddr>, trust_proxy: bool) -> String {
    if trust_proxy {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        let real_ip = || {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        if let Some(raw) = forwarded.or_else(real_ip) {
            return normalize_ip(raw);
        }
    }

    match peer {
        Some(ip) => normalize_ip(&ip.to_string()),
        None => "unknown".to_string(),
    }
}

/// Maps `::1` to `127.0.0.1` and strips the IPv4-mapped IPv6 prefix.
pub fn normalize_ip(raw: &str) -> String {
    match raw.parse::<IpAddr>() {
        Ok(IpAddr::V6(v6)) if v6.is_loopback() => Ipv4Addr::LOCALHOST.to_string(),
        Ok(IpAddr::V6(v6)) => match v6.to_ipv4_mapped() {
            Some(v4) => v4.to_string(),
            None => v6.to_string(),
        },
        Ok(IpAddr::V4(v4)) => v4.to_string(),
        Err(_) => raw.strip_prefix("::ffff:").unwrap_or(raw).to_string(),
    }
}
