//! Client IP extraction for per-client auth failure tracking.
//!
//! # Trusted Proxies
//!
//! Forwarding headers are client-controlled, so they are only honoured when
//! the socket peer (`ConnectInfo<SocketAddr>`) lies inside one of the
//! `TRUSTED_PROXIES` ranges. Otherwise the peer address itself is the client
//! key, and a caller cannot pin failures on someone else's address by
//! setting `X-Forwarded-For`.
//!
//! Resolution order:
//! 1. Peer untrusted (or no ranges configured): the peer address
//! 2. Peer trusted: the rightmost `X-Forwarded-For` hop that is not itself
//!    a trusted proxy, then `X-Real-IP`, then the peer address
//! 3. No peer address at all: [`UNKNOWN_IP`]
//!
//! The peer address is only present when the server was started with
//! `into_make_service_with_connect_info::<SocketAddr>()`.

use std::borrow::Cow;
use std::net::{IpAddr, SocketAddr};

use axum::extract::ConnectInfo;
use axum::http::Request;
use tracing::{debug, warn};

/// Fallback value when no client IP can be determined.
///
/// All such requests share one failure bucket.
pub const UNKNOWN_IP: &str = "unknown";

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_REAL_IP: &str = "x-real-ip";

/// Parsed CIDR network range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CidrRange {
    network: IpAddr,
    prefix_len: u8,
}

impl CidrRange {
    /// Parse CIDR notation (`10.0.0.0/8`, `::1/128`) or a bare address,
    /// which is treated as a single-host range.
    pub fn parse(cidr: &str) -> Option<Self> {
        let (addr, prefix) = match cidr.trim().split_once('/') {
            Some((addr, prefix)) => (addr, Some(prefix)),
            None => (cidr.trim(), None),
        };

        let network: IpAddr = addr.parse().ok()?;
        let max_prefix = match network {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };

        let prefix_len = match prefix {
            Some(p) => p.parse::<u8>().ok().filter(|p| *p <= max_prefix)?,
            None => max_prefix,
        };

        Some(Self {
            network,
            prefix_len,
        })
    }

    /// Whether `ip` falls inside this range. Address families never mix.
    pub fn contains(&self, ip: &IpAddr) -> bool {
        match (self.network, ip) {
            (IpAddr::V4(net), IpAddr::V4(addr)) => {
                let mask = u32::MAX.checked_shl(32 - u32::from(self.prefix_len)).unwrap_or(0);
                (u32::from(net) & mask) == (u32::from(*addr) & mask)
            }
            (IpAddr::V6(net), IpAddr::V6(addr)) => {
                let mask = u128::MAX
                    .checked_shl(128 - u32::from(self.prefix_len))
                    .unwrap_or(0);
                (u128::from(net) & mask) == (u128::from(*addr) & mask)
            }
            _ => false,
        }
    }
}

/// Reverse proxies allowed to report the client address via headers.
///
/// Empty by default, in which case forwarding headers are never trusted.
#[derive(Debug, Clone, Default)]
pub struct TrustedProxies {
    ranges: Vec<CidrRange>,
}

impl TrustedProxies {
    /// Build from CIDR strings. Invalid entries are logged and skipped.
    pub fn new(cidrs: &[String]) -> Self {
        let ranges: Vec<CidrRange> = cidrs
            .iter()
            .filter_map(|cidr| {
                let parsed = CidrRange::parse(cidr);
                if parsed.is_none() {
                    warn!(cidr = %cidr, "Invalid CIDR range in TRUSTED_PROXIES, skipping");
                }
                parsed
            })
            .collect();

        Self { ranges }
    }

    /// Whether any proxy range is configured.
    pub fn is_enabled(&self) -> bool {
        !self.ranges.is_empty()
    }

    /// Whether `ip` belongs to a trusted proxy.
    pub fn contains(&self, ip: &IpAddr) -> bool {
        self.ranges.iter().any(|range| range.contains(ip))
    }
}

/// Client address used to key auth failures.
pub fn extract_client_ip<B>(req: &Request<B>, trusted: &TrustedProxies) -> Cow<'static, str> {
    let Some(peer) = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
    else {
        return Cow::Borrowed(UNKNOWN_IP);
    };

    if !trusted.contains(&peer) {
        if req.headers().contains_key(X_FORWARDED_FOR) || req.headers().contains_key(X_REAL_IP) {
            debug!(peer = %peer, "Ignoring forwarding headers from untrusted peer");
        }
        return Cow::Owned(peer.to_string());
    }

    let client = forwarded_client(req, trusted, peer)
        .or_else(|| header_ip(req, X_REAL_IP))
        .unwrap_or(peer);

    Cow::Owned(client.to_string())
}

/// Walk `X-Forwarded-For` from the nearest hop outwards, skipping trusted
/// proxies. The walk stops at the first hop that does not parse, answering
/// with the last address that was vouched for.
fn forwarded_client<B>(
    req: &Request<B>,
    trusted: &TrustedProxies,
    peer: IpAddr,
) -> Option<IpAddr> {
    let header = req.headers().get(X_FORWARDED_FOR)?.to_str().ok()?;

    let mut vouched = None;
    for hop in header.rsplit(',').map(str::trim).filter(|h| !h.is_empty()) {
        let Ok(ip) = hop.parse::<IpAddr>() else {
            return Some(vouched.unwrap_or(peer));
        };
        if !trusted.contains(&ip) {
            return Some(ip);
        }
        vouched = Some(ip);
    }

    vouched
}

fn header_ip<B>(req: &Request<B>, name: &str) -> Option<IpAddr> {
    req.headers()
        .get(name)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}
