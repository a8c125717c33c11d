//! Pool maintenance workers (§4.7). Grounded on the teacher's `republish_pending_messages`
//! periodic task in `msgpool::mod`, which walks the pending set under lock, drops what's no
//! longer worth keeping, and republishes the rest — generalized here into the expiration sweep,
//! rebroadcast, and pull-unconfirmed loops the spec splits into separate fixed-delay workers.

use crate::chain::{AccountView, ChainStore};
use crate::events::NodeEvent;
use crate::peer::registry::PeerRegistry;
use crate::peer::PeerState;
use crate::pool::{Broadcaster, PeerTransactionSource, TransactionPool};

const REBROADCAST_MIN_AGE_SECS: u32 = 30;

impl<A: AccountView, C: ChainStore> TransactionPool<A, C> {
    /// Expiration sweep (every 1s): drops unconfirmed transactions that have expired or no
    /// longer pass attachment validation, restoring the sender's unconfirmed balance.
    pub async fn sweep_expired(&self) {
        let now = crate::time::now();
        let mut state = self.state.lock().await;
        let expired: Vec<_> = state
            .unconfirmed
            .values()
            .filter(|tx| tx.expiration() < now || tx.attachment_is_valid().is_err())
            .cloned()
            .collect();

        for tx in &expired {
            state.unconfirmed.remove(&tx.id());
        }
        drop(state);

        for tx in &expired {
            let account_id = tx.sender_account_id();
            let amount = tx.amount.as_i64() + tx.fee.as_i64();
            self.accounts.undo_unconfirmed(account_id, amount).await;
            self.events.publish(NodeEvent::TransactionExpired { id: tx.id() });
        }
    }

    /// Rebroadcast sweep (every 60s): republishes locally originated transactions the network
    /// hasn't echoed back yet, once they're at least 30s old. Drops entries that have since been
    /// confirmed, expired, or stopped passing attachment validation.
    pub async fn rebroadcast_pending(&self, broadcaster: &(dyn Broadcaster)) {
        let now = crate::time::now();
        let mut state = self.state.lock().await;
        let confirmed_or_expired: Vec<_> = state
            .non_broadcasted
            .values()
            .filter(|tx| {
                !state.unconfirmed.contains_key(&tx.id())
                    || tx.expiration() < now
                    || tx.attachment_is_valid().is_err()
            })
            .map(|tx| tx.id())
            .collect();
        for id in confirmed_or_expired {
            state.non_broadcasted.remove(&id);
        }

        let due: Vec<_> = state
            .non_broadcasted
            .values()
            .filter(|tx| now.saturating_sub(tx.timestamp) >= REBROADCAST_MIN_AGE_SECS)
            .cloned()
            .collect();
        drop(state);

        if !due.is_empty() {
            broadcaster.broadcast_transactions(&due).await;
        }
    }

    /// Merges transactions pulled from a peer's `getUnconfirmedTransactions` response, without
    /// re-broadcasting them (§4.7's "pull unconfirmed" worker feeds `process_peer_transactions`
    /// with `send_to_peers=false`).
    pub async fn process_peer_transactions(
        &self,
        transactions: Vec<crate::transaction::Transaction>,
        broadcaster: &(dyn Broadcaster),
    ) {
        self.process_transactions(transactions, false, broadcaster).await;
    }

    /// Pull unconfirmed worker (every 5s): picks one connected peer past the pull threshold,
    /// fetches its unconfirmed set, and merges it in without re-broadcasting.
    pub async fn pull_unconfirmed(
        &self,
        registry: &PeerRegistry,
        source: &(dyn PeerTransactionSource),
        broadcaster: &(dyn Broadcaster),
        pull_threshold: i64,
        enable_hallmark_protection: bool,
    ) {
        let now_millis = crate::time::now() as u64 * 1000;
        let Some(peer) = registry.get_any_peer(PeerState::Connected, true, pull_threshold, enable_hallmark_protection, now_millis)
        else {
            return;
        };
        let transactions = source.fetch_unconfirmed(&peer.peer_address).await;
        if !transactions.is_empty() {
            self.process_peer_transactions(transactions, broadcaster).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::memory::TestChain;
    use crate::events::EventBus;
    use crate::transaction::{AtomicAmount, ReferencedTransaction, Transaction};
    use ed25519_dalek::{Signer, SigningKey};
    use rand::rngs::OsRng;
    use std::sync::Arc;

    struct NullBroadcaster;
    #[async_trait::async_trait]
    impl Broadcaster for NullBroadcaster {
        async fn broadcast_transactions(&self, _transactions: &[Transaction]) {}
    }

    fn signed_tx(signing_key: &SigningKey, timestamp: u32, deadline_minutes: u16) -> Transaction {
        let mut header = Vec::new();
        header.push(0u8);
        header.push(0u8);
        header.extend_from_slice(&timestamp.to_le_bytes());
        header.extend_from_slice(&deadline_minutes.to_le_bytes());
        header.extend_from_slice(&signing_key.verifying_key().to_bytes());
        header.extend_from_slice(&7i64.to_le_bytes());
        header.extend_from_slice(&100i64.to_le_bytes());
        header.extend_from_slice(&1i64.to_le_bytes());
        header.extend_from_slice(&0i64.to_le_bytes());
        let signature = signing_key.sign(&header);
        Transaction::new(
            0, 0, timestamp, deadline_minutes, signing_key.verifying_key().to_bytes(), 7,
            AtomicAmount::Wide(100), AtomicAmount::Wide(1), ReferencedTransaction::None,
            signature.to_bytes(), Vec::new(), header,
        )
    }

    #[tokio::test]
    async fn sweep_expired_restores_balance_and_removes_entry() {
        let mut csprng = OsRng;
        let signing_key = SigningKey::generate(&mut csprng);
        let chain = Arc::new(TestChain::new());
        let pool = TransactionPool::new(chain.clone(), chain.clone(), EventBus::new());

        let old_timestamp = crate::time::now().saturating_sub(120);
        let tx = signed_tx(&signing_key, old_timestamp, 1);
        let account_id = tx.sender_account_id();
        chain.set_balance(account_id, 1_000);
        chain.apply_unconfirmed(account_id, 101).await.unwrap();
        {
            let mut state = pool.state.lock().await;
            state.unconfirmed.insert(tx.id(), tx.clone());
        }

        pool.sweep_expired().await;
        assert!(!pool.contains_unconfirmed(tx.id()).await);
    }

    struct FixedSource(Vec<Transaction>);
    #[async_trait::async_trait]
    impl crate::pool::PeerTransactionSource for FixedSource {
        async fn fetch_unconfirmed(&self, _peer_address: &str) -> Vec<Transaction> {
            self.0.clone()
        }
    }

    #[tokio::test]
    async fn pull_unconfirmed_merges_without_rebroadcasting() {
        let mut csprng = OsRng;
        let signing_key = SigningKey::generate(&mut csprng);
        let chain = Arc::new(TestChain::new());
        let tx = signed_tx(&signing_key, crate::time::now(), 60);
        chain.set_balance(tx.sender_account_id(), 10_000);
        let pool = TransactionPool::new(chain.clone(), chain.clone(), EventBus::new());

        let registry = PeerRegistry::new(EventBus::new());
        registry.add_peer("203.0.113.10:7774".to_string());
        registry.with_peer_mut("203.0.113.10:7774", |p| p.state = PeerState::Connected);

        let source = FixedSource(vec![tx.clone()]);
        pool.pull_unconfirmed(&registry, &source, &NullBroadcaster, 0, false).await;

        assert!(pool.contains_unconfirmed(tx.id()).await);
    }
}
