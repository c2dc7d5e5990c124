//! Peer address filtering for monitoring endpoints

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use axum::extract::{ConnectInfo, Request};

/// Loopback, RFC 1918, link-local and IPv6 unique-local addresses.
pub fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_private_v4(v4),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => is_private_v4(v4),
            None => is_private_v6(v6),
        },
    }
}

fn is_private_v4(ip: Ipv4Addr) -> bool {
    ip.is_loopback() || ip.is_private() || ip.is_link_local()
}

fn is_private_v6(ip: Ipv6Addr) -> bool {
    let first = ip.segments()[0];
    ip.is_loopback() || (first & 0xfe00) == 0xfc00 || (first & 0xffc0) == 0xfe80
}

/// Peer address recorded by `into_make_service_with_connect_info`, if any.
pub fn peer_addr(request: &Request) -> Option<SocketAddr> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
}

/// Whether the request may see monitoring output. When the filter is on, a
/// request without a known peer is passed on to the next handler.
pub fn is_allowed(request: &Request, private_only: bool) -> bool {
    if !private_only {
        return true;
    }

    peer_addr(request)
        .map(|addr| is_private_ip(addr.ip()))
        .unwrap_or(false)
}
