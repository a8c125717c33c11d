//! Block apply/undo and replay-hash bookkeeping (§4.6). Grounded on the teacher's
//! `head_change`/`run_head_change` handling of chain reorgs in `msgpool::mod`, which also walks
//! a block's messages to remove them from the pending set on apply and restore them on revert.

use crate::chain::{AccountView, ChainStore};
use crate::constants::GRANDFATHERED_DUPLICATE_HEIGHT;
use crate::events::NodeEvent;
use crate::pool::admission::hash_info_for;
use crate::pool::TransactionPool;
use crate::transaction::{Transaction, TransactionId};

/// A minimal view of a block, enough for the pool's hooks. The full block (header, signature,
/// generator) is the ledger's concern, out of scope here.
pub struct BlockView<'a> {
    pub height: i64,
    pub timestamp: u32,
    pub transactions: &'a [Transaction],
}

impl<A: AccountView, C: ChainStore> TransactionPool<A, C> {
    /// Applies a block's transactions to the pool (§4.6). Ledger effects are delegated to the
    /// chain collaborator; the pool's own job is admitting anything not already unconfirmed and
    /// updating the replay index.
    pub async fn apply(&self, block: &BlockView<'_>) {
        let mut state = self.state.lock().await;
        for tx in block.transactions {
            let id = tx.id();
            if !state.unconfirmed.contains_key(&id) && !state.double_spending.contains_key(&id) {
                let account_id = tx.sender_account_id();
                let amount = tx.amount.as_i64() + tx.fee.as_i64();
                // Best-effort: a transaction arriving only inside a block may already be spent
                // against by something else; ledger apply below is still attempted regardless.
                let _ = self.accounts.apply_unconfirmed(account_id, amount).await;
            }
            if let Err(err) = self.chain.apply_transaction_ledger_effects(tx).await {
                tracing::error!(tx_id = id, %err, "ledger apply failed for a transaction already admitted to a block");
            }
            state.transaction_hashes.insert(tx.hash(), hash_info_for(tx));
        }

        state
            .transaction_hashes
            .retain(|_, info| info.expiration >= block.timestamp);

        state.non_broadcasted.retain(|id, _| !block.transactions.iter().any(|tx| tx.id() == *id));

        drop(state);
        self.events.publish(NodeEvent::BlockApplied {
            height: block.height,
            transaction_count: block.transactions.len(),
        });

        self.update_unconfirmed_transactions(block).await;
    }

    /// Reverses a block's transactions (§4.6): drops replay-index entries whose stored id still
    /// matches this transaction (a later transaction may have already reclaimed that hash slot),
    /// reinserts into `unconfirmed`, and undoes ledger effects.
    pub async fn undo(&self, block: &BlockView<'_>) {
        let mut state = self.state.lock().await;
        for tx in block.transactions {
            let id = tx.id();
            let hash = tx.hash();
            if state.transaction_hashes.get(&hash).map(|info| info.transaction_id) == Some(id) {
                state.transaction_hashes.remove(&hash);
            }
            state.unconfirmed.insert(id, tx.clone());
            let account_id = tx.sender_account_id();
            let amount = tx.amount.as_i64() + tx.fee.as_i64();
            self.accounts.undo_unconfirmed(account_id, amount).await;
            if let Err(err) = self.chain.undo_transaction_ledger_effects(tx).await {
                tracing::error!(tx_id = id, %err, "ledger undo failed; chain may need a rescan");
            }
        }
        drop(state);
        self.events.publish(NodeEvent::BlockUndone { height: block.height });
        tracing::debug!(height = block.height, count = block.transactions.len(), "reinstated unconfirmed transactions after undo");
    }

    /// Checks a candidate block's transaction hashes against the replay index with
    /// put-if-absent semantics (§4.6). At the grandfathered height 58294, the first collision is
    /// tolerated rather than rejected — a historical quirk preserved verbatim rather than
    /// generalized (see DESIGN.md).
    pub async fn check_transaction_hashes(&self, block: &BlockView<'_>) -> Option<TransactionId> {
        let mut state = self.state.lock().await;
        let mut inserted: Vec<[u8; 32]> = Vec::new();
        let mut duplicate = None;

        for tx in block.transactions {
            let hash = tx.hash();
            if state.transaction_hashes.contains_key(&hash) {
                if block.height == GRANDFATHERED_DUPLICATE_HEIGHT && duplicate.is_none() {
                    tracing::warn!(height = block.height, "tolerating grandfathered hash collision");
                    continue;
                }
                duplicate = Some(tx.id());
                break;
            }
            state.transaction_hashes.insert(hash, hash_info_for(tx));
            inserted.push(hash);
        }

        if duplicate.is_some() {
            for hash in inserted {
                state.transaction_hashes.remove(&hash);
            }
        }

        duplicate
    }

    /// Removes confirmed transactions from `unconfirmed` and emits the paired events (§4.6).
    pub async fn update_unconfirmed_transactions(&self, block: &BlockView<'_>) {
        let mut state = self.state.lock().await;
        let mut removed = Vec::new();
        for tx in block.transactions {
            if state.unconfirmed.remove(&tx.id()).is_some() {
                removed.push(tx.id());
            }
        }
        drop(state);
        if !removed.is_empty() {
            tracing::debug!(count = removed.len(), "removed unconfirmed transactions now confirmed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::memory::TestChain;
    use crate::events::EventBus;
    use crate::transaction::{AtomicAmount, ReferencedTransaction};
    use ed25519_dalek::{Signer, SigningKey};
    use rand::rngs::OsRng;
    use std::sync::Arc;

    fn signed_tx(signing_key: &SigningKey, timestamp: u32) -> Transaction {
        let mut header = Vec::new();
        header.push(0u8);
        header.push(0u8);
        header.extend_from_slice(&timestamp.to_le_bytes());
        header.extend_from_slice(&60u16.to_le_bytes());
        header.extend_from_slice(&signing_key.verifying_key().to_bytes());
        header.extend_from_slice(&7i64.to_le_bytes());
        header.extend_from_slice(&100i64.to_le_bytes());
        header.extend_from_slice(&1i64.to_le_bytes());
        header.extend_from_slice(&0i64.to_le_bytes());
        let signature = signing_key.sign(&header);
        Transaction::new(
            0, 0, timestamp, 60, signing_key.verifying_key().to_bytes(), 7,
            AtomicAmount::Wide(100), AtomicAmount::Wide(1), ReferencedTransaction::None,
            signature.to_bytes(), Vec::new(), header,
        )
    }

    #[tokio::test]
    async fn apply_then_undo_restores_unconfirmed_and_balance() {
        let mut csprng = OsRng;
        let signing_key = SigningKey::generate(&mut csprng);
        let chain = Arc::new(TestChain::new());
        let pool = TransactionPool::new(chain.clone(), chain.clone(), EventBus::new());
        let tx = signed_tx(&signing_key, crate::time::now());
        let account_id = tx.sender_account_id();
        chain.set_balance(account_id, 1_000);

        let block = BlockView { height: 100, timestamp: crate::time::now(), transactions: &[tx.clone()] };
        pool.apply(&block).await;
        assert!(!pool.contains_unconfirmed(tx.id()).await);

        pool.undo(&block).await;
        assert!(pool.contains_unconfirmed(tx.id()).await);
    }

    #[tokio::test]
    async fn check_transaction_hashes_tolerates_the_grandfathered_height() {
        let mut csprng = OsRng;
        let signing_key = SigningKey::generate(&mut csprng);
        let chain = Arc::new(TestChain::new());
        let pool = TransactionPool::new(chain.clone(), chain.clone(), EventBus::new());
        let tx = signed_tx(&signing_key, crate::time::now());

        let first = BlockView { height: GRANDFATHERED_DUPLICATE_HEIGHT, timestamp: crate::time::now(), transactions: &[tx.clone()] };
        assert!(pool.check_transaction_hashes(&first).await.is_none());
        let second = BlockView { height: GRANDFATHERED_DUPLICATE_HEIGHT, timestamp: crate::time::now(), transactions: &[tx.clone()] };
        assert!(pool.check_transaction_hashes(&second).await.is_none());
    }

    #[tokio::test]
    async fn check_transaction_hashes_rejects_collisions_elsewhere() {
        let mut csprng = OsRng;
        let signing_key = SigningKey::generate(&mut csprng);
        let chain = Arc::new(TestChain::new());
        let pool = TransactionPool::new(chain.clone(), chain.clone(), EventBus::new());
        let tx = signed_tx(&signing_key, crate::time::now());

        let first = BlockView { height: 999, timestamp: crate::time::now(), transactions: &[tx.clone()] };
        assert!(pool.check_transaction_hashes(&first).await.is_none());
        let second = BlockView { height: 999, timestamp: crate::time::now(), transactions: &[tx.clone()] };
        assert_eq!(pool.check_transaction_hashes(&second).await, Some(tx.id()));
    }
}
