//! Inbound admission pipeline (§4.5). Grounded on the teacher's `add_helper`/`verify_msg_before_add`
//! sequence in `msgpool::mod`: per-message clock and signature checks outside the lock where
//! possible, chain-state and pool-membership checks inside it, one `Error` variant per rejection
//! reason so the caller can decide whether to log-and-drop or blacklist the sender.

use crate::chain::{AccountView, ChainStore};
use crate::error::ValidationError;
use crate::events::NodeEvent;
use crate::pool::{AdmissionOutcome, Broadcaster, TransactionHashInfo, TransactionPool};
use crate::transaction::Transaction;

impl<A: AccountView, C: ChainStore> TransactionPool<A, C> {
    /// Validates `tx` against everything that doesn't require the chain lock: clock gate,
    /// signature, and attachment well-formedness.
    fn validate_before_lock(tx: &Transaction, now: u32) -> Result<(), ValidationError> {
        tx.check_clock(now)?;
        tx.verify_signature()?;
        tx.attachment_is_valid()?;
        Ok(())
    }

    /// Admits a batch of transactions (§4.5). `locally_originated` ids are excluded from the
    /// fan-out-eligibility check since they're already tracked in `non_broadcasted` by
    /// [`TransactionPool::broadcast`].
    pub async fn process_transactions(
        &self,
        transactions: Vec<Transaction>,
        send_to_peers: bool,
        broadcaster: &(dyn Broadcaster),
    ) -> Vec<(Transaction, AdmissionOutcome)> {
        let now = crate::time::now();
        let mut results = Vec::with_capacity(transactions.len());
        let mut fan_out: Vec<Transaction> = Vec::new();

        for tx in transactions {
            if let Err(reason) = Self::validate_before_lock(&tx, now) {
                tracing::debug!(tx_id = tx.id(), %reason, "rejected transaction before chain lock");
                self.events.publish(NodeEvent::TransactionRejected {
                    id: tx.id(),
                    reason: reason.to_string(),
                });
                results.push((tx, AdmissionOutcome::Rejected));
                continue;
            }

            let outcome = self.admit_under_lock(&tx).await;
            if matches!(outcome, AdmissionOutcome::AddedUnconfirmed | AdmissionOutcome::AddedDoubleSpending) {
                let already_local = {
                    let state = self.state.lock().await;
                    state.non_broadcasted.contains_key(&tx.id())
                };
                if !already_local {
                    fan_out.push(tx.clone());
                }
            }
            results.push((tx, outcome));
        }

        if send_to_peers && !fan_out.is_empty() {
            broadcaster.broadcast_transactions(&fan_out).await;
        }

        let added_unconfirmed: Vec<_> = results
            .iter()
            .filter(|(_, o)| *o == AdmissionOutcome::AddedUnconfirmed)
            .map(|(tx, _)| tx.id())
            .collect();
        let added_double_spending: Vec<_> = results
            .iter()
            .filter(|(_, o)| *o == AdmissionOutcome::AddedDoubleSpending)
            .map(|(tx, _)| tx.id())
            .collect();
        if !added_unconfirmed.is_empty() {
            tracing::debug!(count = added_unconfirmed.len(), "added unconfirmed transactions");
        }
        if !added_double_spending.is_empty() {
            tracing::debug!(count = added_double_spending.len(), "added doublespending transactions");
        }

        results
    }

    /// Holds `state`'s lock continuously from the chain-store check through the final insert, so
    /// two concurrent admissions of the same transaction can't both pass the membership checks
    /// before either inserts, and a block apply can't land between the chain-store check and the
    /// pool insert (§4.5, §5: "the first to acquire wins any id/hash race").
    async fn admit_under_lock(&self, tx: &Transaction) -> AdmissionOutcome {
        let id = tx.id();
        let hash = tx.hash();
        let amount = tx.amount.as_i64() + tx.fee.as_i64();
        let account_id = tx.sender_account_id();

        let mut state = self.state.lock().await;

        if self.chain.contains_transaction(id).await {
            return AdmissionOutcome::Rejected;
        }
        if state.unconfirmed.contains_key(&id) || state.double_spending.contains_key(&id) {
            return AdmissionOutcome::Rejected;
        }
        if state.transaction_hashes.contains_key(&hash) {
            tracing::debug!(tx_id = id, "rejected replayed transaction hash");
            return AdmissionOutcome::Rejected;
        }

        match self.accounts.apply_unconfirmed(account_id, amount).await {
            Ok(()) => {
                state.unconfirmed.insert(id, tx.clone());
                drop(state);
                self.events.publish(NodeEvent::TransactionAdmitted { id, fee_nqt: tx.fee.as_i64() });
                AdmissionOutcome::AddedUnconfirmed
            }
            Err(_) => {
                state.double_spending.insert(id, tx.clone());
                AdmissionOutcome::AddedDoubleSpending
            }
        }
    }

    /// Admits a locally originated transaction and, regardless of outcome, tracks it in
    /// `non_broadcasted` so the rebroadcast worker keeps retrying until the network echoes it
    /// back or it expires (§4.5).
    pub async fn broadcast(&self, tx: Transaction, broadcaster: &(dyn Broadcaster)) -> AdmissionOutcome {
        let outcome = self
            .process_transactions(vec![tx.clone()], true, broadcaster)
            .await
            .into_iter()
            .next()
            .map(|(_, outcome)| outcome)
            .unwrap_or(AdmissionOutcome::Rejected);

        let mut state = self.state.lock().await;
        state.non_broadcasted.insert(tx.id(), tx);
        outcome
    }
}

/// Helper retained for block-apply's replay-index insertion (§4.6), shared with
/// [`super::block_hooks`].
pub(super) fn hash_info_for(tx: &Transaction) -> TransactionHashInfo {
    TransactionHashInfo {
        transaction_id: tx.id(),
        expiration: tx.expiration(),
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

    struct NullBroadcaster;
    #[async_trait::async_trait]
    impl Broadcaster for NullBroadcaster {
        async fn broadcast_transactions(&self, _transactions: &[Transaction]) {}
    }

    fn signed_tx(signing_key: &SigningKey, timestamp: u32, amount: i64) -> Transaction {
        let mut header = Vec::new();
        header.push(0u8);
        header.push(0u8);
        header.extend_from_slice(&timestamp.to_le_bytes());
        header.extend_from_slice(&60u16.to_le_bytes());
        header.extend_from_slice(&signing_key.verifying_key().to_bytes());
        header.extend_from_slice(&7i64.to_le_bytes());
        header.extend_from_slice(&amount.to_le_bytes());
        header.extend_from_slice(&1i64.to_le_bytes());
        header.extend_from_slice(&0i64.to_le_bytes());
        let signature = signing_key.sign(&header);
        Transaction::new(
            0,
            0,
            timestamp,
            60,
            signing_key.verifying_key().to_bytes(),
            7,
            AtomicAmount::Wide(amount),
            AtomicAmount::Wide(1),
            ReferencedTransaction::None,
            signature.to_bytes(),
            Vec::new(),
            header,
        )
    }

    #[tokio::test]
    async fn admits_a_well_funded_transaction() {
        let mut csprng = OsRng;
        let signing_key = SigningKey::generate(&mut csprng);
        let chain = Arc::new(TestChain::new());
        let account_id = {
            let tx = signed_tx(&signing_key, crate::time::now(), 100);
            tx.sender_account_id()
        };
        chain.set_balance(account_id, 1_000);
        let pool = TransactionPool::new(chain.clone(), chain.clone(), EventBus::new());

        let tx = signed_tx(&signing_key, crate::time::now(), 100);
        let results = pool
            .process_transactions(vec![tx], true, &NullBroadcaster)
            .await;
        assert_eq!(results[0].1, AdmissionOutcome::AddedUnconfirmed);
        assert_eq!(pool.unconfirmed_count().await, 1);
    }

    #[tokio::test]
    async fn routes_insufficient_balance_to_double_spending() {
        let mut csprng = OsRng;
        let signing_key = SigningKey::generate(&mut csprng);
        let chain = Arc::new(TestChain::new());
        let pool = TransactionPool::new(chain.clone(), chain.clone(), EventBus::new());

        let tx = signed_tx(&signing_key, crate::time::now(), 100);
        let results = pool
            .process_transactions(vec![tx], true, &NullBroadcaster)
            .await;
        assert_eq!(results[0].1, AdmissionOutcome::AddedDoubleSpending);
    }

    #[tokio::test]
    async fn rejects_a_tampered_signature() {
        let mut csprng = OsRng;
        let signing_key = SigningKey::generate(&mut csprng);
        let chain = Arc::new(TestChain::new());
        chain.set_balance(1, 1_000_000);
        let pool = TransactionPool::new(chain.clone(), chain.clone(), EventBus::new());

        let mut tx = signed_tx(&signing_key, crate::time::now(), 100);
        tx.signature[0] ^= 0xff;
        let results = pool
            .process_transactions(vec![tx], true, &NullBroadcaster)
            .await;
        assert_eq!(results[0].1, AdmissionOutcome::Rejected);
    }
}
