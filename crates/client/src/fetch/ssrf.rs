//! SSRF (Server-Side Request Forgery) protection.
//!
//! Document fetches must not reach private, internal, or reserved addresses.
//! Host names are resolved first and every answer is checked.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

use url::{Host, Url};

/// Error type for SSRF validation failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SsrfError {
    #[error("blocked IP: {0} (private/reserved)")]
    BlockedIp(IpAddr),

    #[error("URL has no host: {0}")]
    MissingHost(String),

    #[error("DNS resolution failed: {0}")]
    DnsError(String),
}

/// Whether an address is private, reserved, or otherwise off-limits.
///
/// Covers loopback, RFC 1918, carrier-grade NAT (100.64/10), link-local,
/// multicast, broadcast, unspecified, documentation ranges, IPv6 unique
/// local, and IPv4-mapped IPv6 forms of all of the above.
pub fn is_private_or_reserved(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_blocked_v4(v4),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => is_blocked_v4(v4),
            None => is_blocked_v6(v6),
        },
    }
}

fn is_blocked_v4(v4: Ipv4Addr) -> bool {
    let [a, b, c, _] = v4.octets();
    v4.is_loopback()
        || v4.is_private()
        || v4.is_link_local()
        || v4.is_multicast()
        || v4.is_broadcast()
        || v4.is_unspecified()
        || v4.is_documentation()
        || a == 0
        || (a == 100 && (b & 0xc0) == 64)
        || (a == 192 && b == 0 && c == 0)
}

fn is_blocked_v6(v6: Ipv6Addr) -> bool {
    let first = v6.segments()[0];
    v6.is_loopback()
        || v6.is_multicast()
        || v6.is_unspecified()
        || (first & 0xfe00) == 0xfc00
        || (first & 0xffc0) == 0xfe80
        || (first == 0x2001 && v6.segments()[1] == 0x0db8)
}

/// Reject `ip` if it is private or reserved.
pub fn validate_ip(ip: IpAddr) -> Result<(), SsrfError> {
    if is_private_or_reserved(ip) { Err(SsrfError::BlockedIp(ip)) } else { Ok(()) }
}

/// Reject `url` unless every address its host resolves to is public.
///
/// IP literals are checked directly; names go through the system resolver,
/// bounded by `timeout`.
pub async fn ensure_public_host(url: &Url, timeout: Duration) -> Result<(), SsrfError> {
    let host = url.host().ok_or_else(|| SsrfError::MissingHost(url.to_string()))?;
    let name = match host {
        Host::Ipv4(v4) => return validate_ip(IpAddr::V4(v4)),
        Host::Ipv6(v6) => return validate_ip(IpAddr::V6(v6)),
        Host::Domain(name) => name,
    };

    let port = url.port_or_known_default().unwrap_or(443);
    let answers = tokio::time::timeout(timeout, tokio::net::lookup_host((name, port)))
        .await
        .map_err(|_| SsrfError::DnsError(format!("{name}: timed out after {timeout:?}")))?
        .map_err(|e| SsrfError::DnsError(format!("{name}: {e}")))?;

    let mut resolved = 0usize;
    for addr in answers {
        validate_ip(addr.ip())?;
        resolved += 1;
    }
    if resolved == 0 {
        return Err(SsrfError::DnsError(format!("{name}: no addresses")));
    }
    Ok(())
}

/// Cheap check for redirect targets: only IP-literal hosts can be judged
/// without a lookup.
pub(crate) fn is_blocked_literal(url: &Url) -> bool {
    match url.host() {
        Some(Host::Ipv4(v4)) => is_private_or_reserved(IpAddr::V4(v4)),
        Some(Host::Ipv6(v6)) => is_private_or_reserved(IpAddr::V6(v6)),
        Some(Host::Domain(name)) => name.eq_ignore_ascii_case("localhost"),
        None => true,
    }
}
