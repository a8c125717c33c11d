//! Concurrent peer map (§4.1). Grounded on the teacher's `parking_lot::RwLock`-guarded maps used
//! throughout `msgpool::mod` (`pending`, `cur_tipset`) for the lock-per-operation discipline, and
//! on `rand`'s weighted-index distribution for `get_any_peer`'s selection rule.

use std::collections::HashMap;

use parking_lot::RwLock;
use rand::distributions::{Distribution, WeightedIndex};
use rand::thread_rng;

use crate::chain::AccountView;
use crate::events::{EventBus, NodeEvent};
use crate::peer::{Peer, PeerId, PeerState};

/// Concurrent registry of known peers, keyed by normalized address.
pub struct PeerRegistry {
    peers: RwLock<HashMap<PeerId, Peer>>,
    events: EventBus,
}

impl PeerRegistry {
    pub fn new(events: EventBus) -> Self {
        Self {
            peers: RwLock::new(HashMap::new()),
            events,
        }
    }

    /// Inserts a new peer record if `address` is not already known. Returns the existing or
    /// newly created record; emits [`NodeEvent::PeerConnected`] only on first insertion, matching
    /// the spec's "constructs a new peer record if absent" (connection state is set separately by
    /// the connect worker, not implied by registration).
    pub fn add_peer(&self, address: PeerId) -> Peer {
        let mut peers = self.peers.write();
        if let Some(existing) = peers.get(&address) {
            return existing.clone();
        }
        let peer = Peer::new(address.clone());
        peers.insert(address.clone(), peer.clone());
        drop(peers);
        self.events.publish(NodeEvent::PeerConnected { id: address });
        peer
    }

    pub fn get_peer(&self, address: &str) -> Option<Peer> {
        self.peers.read().get(address).cloned()
    }

    pub fn remove_peer(&self, address: &str) -> Option<Peer> {
        self.peers.write().remove(address)
    }

    /// Applies `mutate` to the peer at `address` under the write lock, if present.
    pub fn with_peer_mut<F>(&self, address: &str, mutate: F)
    where
        F: FnOnce(&mut Peer),
    {
        if let Some(peer) = self.peers.write().get_mut(address) {
            mutate(peer);
        }
    }

    pub fn get_all_peers(&self) -> Vec<Peer> {
        self.peers.read().values().cloned().collect()
    }

    pub fn connected_count(&self) -> usize {
        self.peers
            .read()
            .values()
            .filter(|p| p.state == PeerState::Connected)
            .count()
    }

    /// Weighted-random selection over peers matching `state`, not currently blacklisted, willing
    /// to share their address, and — when `apply_pull_threshold` is set — clearing
    /// `pull_threshold`. A weight of 0 is treated as 1 so un-hallmarked peers remain selectable,
    /// just proportionally less likely than a weighted hub.
    pub fn get_any_peer(
        &self,
        state: PeerState,
        apply_pull_threshold: bool,
        pull_threshold: i64,
        enable_hallmark_protection: bool,
        now_millis: u64,
    ) -> Option<Peer> {
        let peers = self.peers.read();
        let candidates: Vec<&Peer> = peers
            .values()
            .filter(|p| p.state == state)
            .filter(|p| !p.is_blacklisted(now_millis))
            .filter(|p| p.share_address)
            .filter(|p| {
                !(apply_pull_threshold && enable_hallmark_protection) || p.weight >= pull_threshold
            })
            .collect();

        if candidates.is_empty() {
            return None;
        }

        let weights: Vec<i64> = candidates.iter().map(|p| p.weight.max(1)).collect();
        let distribution = WeightedIndex::new(&weights).ok()?;
        let index = distribution.sample(&mut thread_rng());
        Some(candidates[index].clone())
    }

    /// Re-derives `weight` for every hallmarked peer from `accounts`'s current effective balance
    /// (§4.2: "the registry subscribes to account-balance change events and re-emits a `Weight`
    /// event for every peer whose hallmark account id equals the changed account"). Driven by a
    /// periodic worker rather than a direct per-transaction hook, so the registry never needs a
    /// live reference into the pool's admission path.
    pub async fn recompute_weights(&self, accounts: &impl AccountView) {
        let hallmarked: Vec<(PeerId, i64)> = self
            .peers
            .read()
            .values()
            .filter_map(|p| p.hallmark.as_ref().map(|h| (p.peer_address.clone(), h.account_id())))
            .collect();

        for (address, account_id) in hallmarked {
            let balance = accounts.effective_balance(account_id).await;
            let changed = self.peers.write().get_mut(&address).map(|peer| {
                let before = peer.weight;
                peer.recompute_weight(balance);
                (peer.weight, peer.weight != before)
            });
            if let Some((weight, true)) = changed {
                self.events.publish(NodeEvent::PeerWeightChanged { id: address, weight });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> PeerRegistry {
        PeerRegistry::new(EventBus::new())
    }

    #[test]
    fn add_peer_is_idempotent() {
        let registry = registry();
        let first = registry.add_peer("203.0.113.5:7774".to_string());
        let second = registry.add_peer("203.0.113.5:7774".to_string());
        assert_eq!(first.peer_address, second.peer_address);
        assert_eq!(registry.get_all_peers().len(), 1);
    }

    #[test]
    fn get_any_peer_skips_blacklisted_and_non_sharing() {
        let registry = registry();
        registry.add_peer("203.0.113.1:7774".to_string());
        registry.with_peer_mut("203.0.113.1:7774", |p| {
            p.state = PeerState::Connected;
            p.blacklist_for(0, 10_000, "test");
        });
        registry.add_peer("203.0.113.2:7774".to_string());
        registry.with_peer_mut("203.0.113.2:7774", |p| {
            p.state = PeerState::Connected;
            p.share_address = false;
        });
        assert!(registry
            .get_any_peer(PeerState::Connected, false, 0, false, 0)
            .is_none());
    }

    #[test]
    fn get_any_peer_selects_among_eligible_peers() {
        let registry = registry();
        registry.add_peer("203.0.113.1:7774".to_string());
        registry.with_peer_mut("203.0.113.1:7774", |p| p.state = PeerState::Connected);
        let selected = registry.get_any_peer(PeerState::Connected, false, 0, false, 0);
        assert_eq!(selected.unwrap().peer_address, "203.0.113.1:7774");
    }

    #[tokio::test]
    async fn recompute_weights_updates_hallmarked_peers_and_emits_event() {
        use crate::chain::memory::TestChain;
        use ed25519_dalek::{Signer, SigningKey};
        use rand::rngs::OsRng;

        let mut csprng = OsRng;
        let signing_key = SigningKey::generate(&mut csprng);
        let address = "203.0.113.7:7774".to_string();

        let mut hallmark = crate::hallmark::Hallmark {
            account_public_key: signing_key.verifying_key().to_bytes(),
            host: address.clone(),
            weight_factor: 5,
            date: 0,
            nonce: 1,
            signature: [0u8; 64],
        };
        let message_signature = signing_key.sign(&signature_message(&hallmark));
        hallmark.signature = message_signature.to_bytes();

        let registry = registry();
        registry.add_peer(address.clone());
        registry.with_peer_mut(&address, |p| p.hallmark = Some(hallmark.clone()));

        let chain = TestChain::new();
        chain.set_balance(hallmark.account_id(), 1_000_000_000_000);

        let mut rx = registry.events.subscribe();
        registry.recompute_weights(&chain).await;

        assert!(registry.get_peer(&address).unwrap().weight > 0);
        let event = crate::events::recv_lossy(&mut rx).await.unwrap();
        assert!(matches!(event, NodeEvent::PeerWeightChanged { .. }));
    }

    fn signature_message(hallmark: &crate::hallmark::Hallmark) -> Vec<u8> {
        let mut message = Vec::new();
        message.extend_from_slice(&hallmark.account_public_key);
        message.push(hallmark.host.len() as u8);
        message.extend_from_slice(hallmark.host.as_bytes());
        message.extend_from_slice(&hallmark.weight_factor.to_le_bytes());
        message.extend_from_slice(&hallmark.date.to_le_bytes());
        message.extend_from_slice(&hallmark.nonce.to_le_bytes());
        message
    }
}
