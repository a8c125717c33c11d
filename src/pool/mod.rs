//! Transaction pool (§3, §4.5–§4.7). Grounded directly on the teacher's `MessagePool`/`MsgSet` in
//! `blockchain/message_pool/src/msgpool/mod.rs`: a chain-mutex-guarded set of indices, generic
//! over an external `Provider`-like collaborator, with admission, block-apply/undo, and periodic
//! maintenance split into their own submodules the way the teacher splits `mod.rs` from
//! `msg_chain.rs`/`block_store.rs`.

pub mod admission;
pub mod block_hooks;
pub mod workers;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::chain::{AccountView, ChainStore};
use crate::events::EventBus;
use crate::transaction::{Transaction, TransactionHash, TransactionHashInfo, TransactionId};

/// Outcome of admitting a single transaction, used to build the batched events §4.5 describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionOutcome {
    AddedUnconfirmed,
    AddedDoubleSpending,
    Rejected,
}

/// The four pool indices, guarded together by the chain mutex — mirrors the teacher's
/// `pending: RwLock<HashMap<Address, MsgSet>>` guarded alongside `cur_tipset`.
#[derive(Default)]
pub struct PoolState {
    pub unconfirmed: HashMap<TransactionId, Transaction>,
    pub double_spending: HashMap<TransactionId, Transaction>,
    /// Locally originated transactions not yet observed echoed back by the network.
    pub non_broadcasted: HashMap<TransactionId, Transaction>,
    pub transaction_hashes: HashMap<TransactionHash, TransactionHashInfo>,
}

/// Best-effort outbound fan-out, implemented by the peer overlay (§4.4). Kept as a trait here so
/// the pool never depends on peer/gossip internals directly — the same separation the teacher
/// keeps between `MessagePool` and the libp2p network service it's handed a channel to.
#[async_trait::async_trait]
pub trait Broadcaster: Send + Sync {
    async fn broadcast_transactions(&self, transactions: &[Transaction]);
}

/// Inbound counterpart to [`Broadcaster`]: fetches a peer's unconfirmed set for the pull worker
/// (§4.7). Kept as its own trait rather than folded into `Broadcaster` since push and pull are
/// implemented by the same gossip client but serve different workers.
#[async_trait::async_trait]
pub trait PeerTransactionSource: Send + Sync {
    async fn fetch_unconfirmed(&self, peer_address: &str) -> Vec<Transaction>;
}

/// Chain-mutex-guarded transaction pool, generic over the chain/account collaborators exactly as
/// the teacher's `MessagePool<T: Provider>` is generic over `T`.
pub struct TransactionPool<A: AccountView, C: ChainStore> {
    state: Mutex<PoolState>,
    accounts: Arc<A>,
    chain: Arc<C>,
    events: EventBus,
}

impl<A: AccountView, C: ChainStore> TransactionPool<A, C> {
    pub fn new(accounts: Arc<A>, chain: Arc<C>, events: EventBus) -> Self {
        Self {
            state: Mutex::new(PoolState::default()),
            accounts,
            chain,
            events,
        }
    }

    pub async fn unconfirmed_count(&self) -> usize {
        self.state.lock().await.unconfirmed.len()
    }

    pub async fn contains_unconfirmed(&self, id: TransactionId) -> bool {
        self.state.lock().await.unconfirmed.contains_key(&id)
    }

    pub async fn unconfirmed_snapshot(&self) -> Vec<Transaction> {
        self.state.lock().await.unconfirmed.values().cloned().collect()
    }
}
