//! Root node value (§4.9). Generalizes the distilled spec's "the chain mutex, the pool maps, the
//! registry, and the scheduler are process-wide singletons" into one explicitly-constructed,
//! passed-by-reference value, the way the teacher's `Forest`/`Services` struct in `forest/src/daemon`
//! owns the store, chain, and network handles rather than reaching for statics.

use std::sync::Arc;
use std::time::Duration;

use crate::chain::{AccountView, ChainStore};
use crate::config::NodeConfig;
use crate::events::EventBus;
use crate::gossip::workers::{GossipWorkers, PeerStore};
use crate::gossip::GossipClient;
use crate::peer::registry::PeerRegistry;
use crate::pool::TransactionPool;
use crate::scheduler::Scheduler;

/// Owns every process-wide collaborator: the peer registry, the transaction pool (which itself
/// holds the chain mutex), the event bus, and the worker scheduler.
pub struct Node<A: AccountView + 'static, C: ChainStore + 'static> {
    pub config: Arc<NodeConfig>,
    pub registry: Arc<PeerRegistry>,
    pub pool: Arc<TransactionPool<A, C>>,
    pub accounts: Arc<A>,
    pub events: EventBus,
    pub gossip: Arc<GossipClient>,
}

impl<A: AccountView + 'static, C: ChainStore + 'static> Node<A, C> {
    pub fn new(config: NodeConfig, accounts: Arc<A>, chain: Arc<C>) -> Self {
        let config = Arc::new(config);
        let events = EventBus::new();
        let registry = Arc::new(PeerRegistry::new(events.clone()));
        let gossip = Arc::new(GossipClient::new(registry.clone(), config.clone()));
        let pool = Arc::new(TransactionPool::new(accounts.clone(), chain, events.clone()));

        Self { config, registry, pool, accounts, events, gossip }
    }

    /// Registers every periodic worker (§4.3, §4.7) with a fresh [`Scheduler`] and starts it.
    /// Matches the two-phase register-then-start lifecycle (§5): nothing runs until every worker
    /// has been registered.
    pub fn run(&self, peer_store: Option<Arc<dyn PeerStore>>) -> RunningNode {
        let mut scheduler = Scheduler::new();
        let workers = Arc::new(GossipWorkers::new(
            self.registry.clone(),
            self.config.clone(),
            self.gossip.clone(),
            self.events.clone(),
            peer_store,
        ));

        {
            let workers = workers.clone();
            tokio::spawn(async move { workers.seed_from_store().await });
        }
        {
            let workers = workers.clone();
            scheduler.register("unblacklist-sweep", Duration::from_secs(1), move || {
                let workers = workers.clone();
                async move {
                    workers.sweep_unblacklist().await;
                    Ok(())
                }
            });
        }
        {
            let workers = workers.clone();
            scheduler.register("connect", Duration::from_secs(5), move || {
                let workers = workers.clone();
                async move {
                    workers.connect_one().await;
                    Ok(())
                }
            });
        }
        {
            let workers = workers.clone();
            scheduler.register("discover-peers", Duration::from_secs(5), move || {
                let workers = workers.clone();
                async move {
                    workers.discover_peers().await;
                    Ok(())
                }
            });
        }
        {
            let pool = self.pool.clone();
            scheduler.register("sweep-expired", Duration::from_secs(1), move || {
                let pool = pool.clone();
                async move {
                    pool.sweep_expired().await;
                    Ok(())
                }
            });
        }
        {
            let pool = self.pool.clone();
            let gossip = self.gossip.clone();
            scheduler.register("rebroadcast", Duration::from_secs(60), move || {
                let pool = pool.clone();
                let gossip = gossip.clone();
                async move {
                    pool.rebroadcast_pending(gossip.as_ref()).await;
                    Ok(())
                }
            });
        }
        {
            let pool = self.pool.clone();
            let registry = self.registry.clone();
            let gossip = self.gossip.clone();
            let config = self.config.clone();
            scheduler.register("pull-unconfirmed", Duration::from_secs(5), move || {
                let pool = pool.clone();
                let registry = registry.clone();
                let gossip = gossip.clone();
                let config = config.clone();
                async move {
                    pool.pull_unconfirmed(
                        registry.as_ref(),
                        gossip.as_ref(),
                        gossip.as_ref(),
                        config.pull_threshold,
                        config.enable_hallmark_protection,
                    )
                    .await;
                    Ok(())
                }
            });
        }

        {
            let registry = self.registry.clone();
            let accounts = self.accounts.clone();
            scheduler.register("recompute-weights", Duration::from_secs(10), move || {
                let registry = registry.clone();
                let accounts = accounts.clone();
                async move {
                    registry.recompute_weights(accounts.as_ref()).await;
                    Ok(())
                }
            });
        }

        let handles = scheduler.start();
        RunningNode { handles }
    }
}

/// Handle to a running node's background workers. Dropping it does not stop them; call
/// [`RunningNode::shutdown`] for a cooperative stop.
pub struct RunningNode {
    handles: Vec<tokio::task::JoinHandle<()>>,
}

impl RunningNode {
    pub async fn shutdown(self) {
        for handle in self.handles {
            handle.abort();
        }
    }
}
