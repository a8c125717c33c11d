//! Peer record and address normalization (§3, §4.1). Grounded on the shape of the teacher's
//! `node/forest_libp2p/src/config.rs` bootstrap-address handling, generalized from libp2p
//! multiaddrs to bare `host:port` strings, plus `Ian-Reitsma-the-block`'s `net/ban_store.rs` for
//! the blacklist-deadline idiom.

pub mod registry;

use std::net::{IpAddr, SocketAddr, ToSocketAddrs};

use serde::{Deserialize, Serialize};

use crate::error::PeerError;
use crate::hallmark::Hallmark;

/// A peer is identified by its normalized `host:port` address.
pub type PeerId = String;

/// Connection lifecycle state of a peer record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeerState {
    NonConnected,
    Connected,
    Disconnected,
}

/// Per-remote peer state (§3's `Peer`).
#[derive(Debug, Clone)]
pub struct Peer {
    pub peer_address: PeerId,
    pub announced_address: Option<PeerId>,
    pub state: PeerState,
    pub blacklisted_until: Option<u64>,
    pub downloaded_volume: i64,
    pub uploaded_volume: i64,
    pub hallmark: Option<Hallmark>,
    pub weight: i64,
    pub application: Option<String>,
    pub version: Option<String>,
    pub platform: Option<String>,
    pub share_address: bool,
}

impl Peer {
    pub fn new(peer_address: PeerId) -> Self {
        Self {
            peer_address,
            announced_address: None,
            state: PeerState::NonConnected,
            blacklisted_until: None,
            downloaded_volume: 0,
            uploaded_volume: 0,
            hallmark: None,
            weight: 0,
            application: None,
            version: None,
            platform: None,
            share_address: true,
        }
    }

    pub fn is_blacklisted(&self, now_millis: u64) -> bool {
        self.blacklisted_until.is_some_and(|until| now_millis < until)
    }

    pub fn blacklist_for(&mut self, now_millis: u64, period_millis: u64, reason: &str) {
        tracing::debug!(peer = %self.peer_address, reason, "blacklisting peer");
        self.blacklisted_until = Some(now_millis + period_millis);
        self.state = PeerState::Disconnected;
    }

    /// Recomputes `weight` from the currently attached hallmark and an externally supplied
    /// account effective balance (0 if no hallmark is attached, or it fails host verification).
    pub fn recompute_weight(&mut self, account_effective_balance: i64) {
        self.weight = match &self.hallmark {
            Some(hallmark) if hallmark.verify(&self.peer_address).is_ok() => {
                crate::hallmark::effective_weight(hallmark, account_effective_balance)
            }
            _ => 0,
        };
    }
}

/// Normalizes a raw `host[:port]` string into a canonical `PeerId`, rejecting addresses that
/// resolve to loopback, link-local, or unspecified ("any-local") hosts — a peer overlay must
/// never treat those as remote identities. On testnet, an address that explicitly names a port
/// other than `expected_port` is rejected too (§4.1: "does not use the testnet port").
pub fn normalize_address(
    raw: &str,
    expected_port: u16,
    my_address: Option<&str>,
    is_testnet: bool,
) -> Result<PeerId, PeerError> {
    let (host, port, explicit_port) = split_host_port(raw, expected_port);
    let normalized = format!("{host}:{port}");

    if is_testnet && explicit_port && port != expected_port {
        return Err(PeerError::WrongNetworkPort(normalized));
    }

    if let Some(mine) = my_address {
        if normalized == mine || host == "localhost" {
            return Err(PeerError::IsSelf(normalized));
        }
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        if is_disallowed_ip(ip) {
            return Err(PeerError::Unroutable(normalized));
        }
    } else if host == "localhost" {
        return Err(PeerError::Unroutable(normalized));
    }

    Ok(normalized)
}

/// Splits `raw` into host and port, reporting whether the port was explicit in `raw` (as opposed
/// to filled in from `default_port`).
fn split_host_port(raw: &str, default_port: u16) -> (String, u16, bool) {
    match raw.rsplit_once(':') {
        Some((host, port_str)) => match port_str.parse::<u16>() {
            Ok(port) => (host.to_string(), port, true),
            Err(_) => (raw.to_string(), default_port, false),
        },
        None => (raw.to_string(), default_port, false),
    }
}

fn is_disallowed_ip(ip: IpAddr) -> bool {
    ip.is_loopback() || ip.is_unspecified() || is_link_local(ip)
}

fn is_link_local(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_link_local(),
        IpAddr::V6(v6) => (v6.segments()[0] & 0xffc0) == 0xfe80,
    }
}

/// Resolves `address` to a concrete [`SocketAddr`] for an outbound connection attempt. A
/// resolution failure is a network error, not a configuration error — DNS can fail transiently.
pub fn resolve(address: &PeerId) -> Result<SocketAddr, PeerError> {
    address
        .to_socket_addrs()
        .map_err(|e| PeerError::Other(format!("dns resolution failed for {address}: {e}")))?
        .next()
        .ok_or_else(|| PeerError::Unroutable(address.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_loopback() {
        assert!(matches!(
            normalize_address("127.0.0.1:7774", 7774, None, false),
            Err(PeerError::Unroutable(_))
        ));
    }

    #[test]
    fn rejects_unspecified() {
        assert!(matches!(
            normalize_address("0.0.0.0:7774", 7774, None, false),
            Err(PeerError::Unroutable(_))
        ));
    }

    #[test]
    fn accepts_a_routable_address_with_default_port() {
        let normalized = normalize_address("203.0.113.5", 7774, None, false).unwrap();
        assert_eq!(normalized, "203.0.113.5:7774");
    }

    #[test]
    fn rejects_self() {
        assert!(matches!(
            normalize_address("203.0.113.5:7774", 7774, Some("203.0.113.5:7774"), false),
            Err(PeerError::IsSelf(_))
        ));
    }

    #[test]
    fn rejects_explicit_wrong_port_on_testnet() {
        assert!(matches!(
            normalize_address("203.0.113.5:7774", 6874, None, true),
            Err(PeerError::WrongNetworkPort(_))
        ));
    }

    #[test]
    fn accepts_matching_explicit_port_on_testnet() {
        let normalized = normalize_address("203.0.113.5:6874", 6874, None, true).unwrap();
        assert_eq!(normalized, "203.0.113.5:6874");
    }

    #[test]
    fn fills_in_expected_port_on_testnet_when_absent() {
        let normalized = normalize_address("203.0.113.5", 6874, None, true).unwrap();
        assert_eq!(normalized, "203.0.113.5:6874");
    }
}
