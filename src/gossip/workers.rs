//! Periodic gossip workers (§4.3). Grounded on the un-blacklist/connect/discovery cadence
//! described in §4.3, implemented the way the teacher schedules its own background tasks in
//! `msgpool::mod` (`tokio::spawn` loops wrapped in an outer catch) — generalized to three workers
//! registered with [`crate::scheduler::Scheduler`] rather than one.

use std::sync::Arc;

use async_trait::async_trait;
use rand::Rng;
use tracing::{debug, warn};

use crate::config::NodeConfig;
use crate::events::{EventBus, NodeEvent};
use crate::gossip::protocol::{PeerInfo, PeersResponse};
use crate::gossip::GossipClient;
use crate::peer::registry::PeerRegistry;
use crate::peer::{self, PeerState};

/// External collaborator for peer-set persistence (§4.3's "if peer-set persistence is enabled").
/// The core only calls `load`/`save`; the actual storage medium (file, database) is out of scope.
#[async_trait]
pub trait PeerStore: Send + Sync {
    async fn load(&self) -> Vec<String>;
    async fn save(&self, addresses: &[String]);
}

pub struct GossipWorkers {
    registry: Arc<PeerRegistry>,
    config: Arc<NodeConfig>,
    client: Arc<GossipClient>,
    events: EventBus,
    peer_store: Option<Arc<dyn PeerStore>>,
}

impl GossipWorkers {
    pub fn new(
        registry: Arc<PeerRegistry>,
        config: Arc<NodeConfig>,
        client: Arc<GossipClient>,
        events: EventBus,
        peer_store: Option<Arc<dyn PeerStore>>,
    ) -> Self {
        Self { registry, config, client, events, peer_store }
    }

    /// Un-blacklist sweep (every 1s): clears any peer whose blacklist deadline has passed.
    pub async fn sweep_unblacklist(&self) {
        let now = now_millis();
        for peer in self.registry.get_all_peers() {
            if let Some(until) = peer.blacklisted_until {
                if until <= now {
                    self.registry.with_peer_mut(&peer.peer_address, |p| p.blacklisted_until = None);
                    debug!(peer = %peer.peer_address, "un-blacklisted");
                }
            }
        }
    }

    /// Connect worker (every 5s): opportunistically connects to one non-connected or
    /// disconnected peer, chosen by a fair coin, if under the configured connection target.
    pub async fn connect_one(&self) {
        if self.registry.connected_count() >= self.config.max_number_of_connected_public_peers {
            return;
        }
        let state = if rand::thread_rng().gen_bool(0.5) {
            PeerState::NonConnected
        } else {
            PeerState::Disconnected
        };
        let Some(candidate) = self.registry.get_any_peer(state, false, 0, false, now_millis()) else {
            return;
        };

        match self.client.get_info(&candidate.peer_address).await {
            Ok(info) => {
                self.registry.with_peer_mut(&candidate.peer_address, |p| {
                    p.state = PeerState::Connected;
                    p.application = Some(info.application);
                    p.version = Some(info.version);
                    p.platform = info.platform;
                    p.share_address = info.share_address;
                    p.announced_address = info.announced_address;
                });
                self.events.publish(NodeEvent::PeerConnected { id: candidate.peer_address });
            }
            Err(err) => {
                warn!(peer = %candidate.peer_address, %err, "connect attempt failed");
                self.registry.with_peer_mut(&candidate.peer_address, |p| {
                    p.state = PeerState::Disconnected;
                });
            }
        }
    }

    /// One-time startup reconciliation (§4.3): if peer-set persistence is enabled, re-registers
    /// every address from the persisted set so previously known peers survive a restart instead
    /// of the store only ever being written to.
    pub async fn seed_from_store(&self) {
        if !(self.config.use_peers_db && self.config.save_peers) {
            return;
        }
        let Some(store) = &self.peer_store else { return };
        for address in store.load().await {
            self.registry.add_peer(address);
        }
    }

    /// Peer discovery worker (every 5s): asks a connected peer for its peer list and registers
    /// every address it returns, then reconciles against the persisted set if enabled.
    pub async fn discover_peers(&self) {
        let Some(peer) = self
            .registry
            .get_any_peer(PeerState::Connected, true, self.config.pull_threshold, self.config.enable_hallmark_protection, now_millis())
        else {
            return;
        };

        match self.client.get_peers(&peer.peer_address).await {
            Ok(response) => {
                for announced in response.peers {
                    if let Ok(normalized) = peer::normalize_address(
                        &announced,
                        self.config.effective_peer_server_port(),
                        self.config.my_address.as_deref(),
                        self.config.is_testnet,
                    ) {
                        self.registry.add_peer(normalized);
                    }
                }
            }
            Err(err) => {
                debug!(peer = %peer.peer_address, %err, "getPeers failed");
            }
        }

        if self.config.use_peers_db && self.config.save_peers {
            if let Some(store) = &self.peer_store {
                let live: Vec<String> = self.registry.get_all_peers().into_iter().map(|p| p.peer_address).collect();
                store.save(&live).await;
            }
        }
    }
}

fn now_millis() -> u64 {
    crate::time::now() as u64 * 1000
}

impl GossipClient {
    pub async fn get_info(&self, peer_address: &str) -> Result<PeerInfo, crate::error::NetworkError> {
        self.get_json(peer_address, "/getInfo").await
    }

    pub async fn get_peers(&self, peer_address: &str) -> Result<PeersResponse, crate::error::NetworkError> {
        self.get_json(peer_address, "/getPeers").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;

    struct NoopPeerStore;
    #[async_trait]
    impl PeerStore for NoopPeerStore {
        async fn load(&self) -> Vec<String> {
            Vec::new()
        }
        async fn save(&self, _addresses: &[String]) {}
    }

    #[tokio::test]
    async fn sweep_unblacklist_clears_expired_entries() {
        let registry = Arc::new(PeerRegistry::new(EventBus::new()));
        registry.add_peer("203.0.113.9:7774".to_string());
        registry.with_peer_mut("203.0.113.9:7774", |p| p.blacklist_for(0, 0, "test"));
        let config = Arc::new(NodeConfig::default());
        let client = Arc::new(GossipClient::new(registry.clone(), config.clone()));
        let workers = GossipWorkers::new(registry.clone(), config, client, EventBus::new(), Some(Arc::new(NoopPeerStore)));

        workers.sweep_unblacklist().await;
        assert!(!registry.get_peer("203.0.113.9:7774").unwrap().is_blacklisted(now_millis()));
    }
}
