//! External collaborator seam (§4.6, §4.9). Mirrors the teacher's `msgpool::provider::Provider`
//! trait: the pool depends on an abstract view of chain state and never reaches into ledger
//! internals directly, so the ledger, forging, and storage subsystems (explicitly out of scope)
//! can be swapped or stubbed without touching admission logic.

use async_trait::async_trait;

use crate::error::{InsufficientFundsError, UndoNotSupportedError};
use crate::transaction::{Transaction, TransactionId};

/// A minimal view of an account's balance state, as needed by admission and the maintenance
/// workers. The real ledger also tracks confirmed balance, stake, and history; none of that is
/// this crate's concern.
#[async_trait]
pub trait AccountView: Send + Sync {
    /// The account's current effective balance, in atomic units, for hallmark weighting.
    async fn effective_balance(&self, account_id: i64) -> i64;

    /// Reserves `amount` atomic units of unconfirmed balance for `account_id`. Fails with
    /// [`InsufficientFundsError`] if the account cannot cover it; this is what routes a
    /// transaction into the pool's `double_spending` index instead of `unconfirmed`.
    async fn apply_unconfirmed(
        &self,
        account_id: i64,
        amount: i64,
    ) -> Result<(), InsufficientFundsError>;

    /// Releases a previously reserved unconfirmed amount, restoring the sender's balance.
    async fn undo_unconfirmed(&self, account_id: i64, amount: i64);
}

/// A minimal view of block/chain state, as needed by the admission pipeline and replay index.
/// Mirrors `Provider::get_actor_after`/`head_change` in shape, generalized to this network's
/// flatter id-keyed store rather than an IPLD actor tree.
#[async_trait]
pub trait ChainStore: Send + Sync {
    /// Whether `id` is already present in confirmed storage (used to short-circuit admission of
    /// transactions the chain has already seen).
    async fn contains_transaction(&self, id: TransactionId) -> bool;

    /// Applies ledger effects for a transaction during block apply. Out of scope beyond the
    /// signature this trait exposes — forging and ledger mutation live elsewhere.
    async fn apply_transaction_ledger_effects(&self, tx: &Transaction) -> Result<(), UndoNotSupportedError>;

    /// Reverses ledger effects for a transaction during block undo.
    async fn undo_transaction_ledger_effects(&self, tx: &Transaction) -> Result<(), UndoNotSupportedError>;
}

/// In-memory stand-in for [`AccountView`] and [`ChainStore`], mirroring the teacher's
/// `msgpool::test_provider::TestApi`: enough fidelity to drive pool unit tests, and to give the
/// CLI binary something to run against before it's wired to a real ledger crate.
pub mod memory {
    use std::collections::HashMap;

    use parking_lot::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct TestChain {
        balances: Mutex<HashMap<i64, i64>>,
        confirmed: Mutex<std::collections::HashSet<TransactionId>>,
    }

    impl TestChain {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_balance(&self, account_id: i64, balance: i64) {
            self.balances.lock().insert(account_id, balance);
        }

        pub fn mark_confirmed(&self, id: TransactionId) {
            self.confirmed.lock().insert(id);
        }
    }

    #[async_trait]
    impl AccountView for TestChain {
        async fn effective_balance(&self, account_id: i64) -> i64 {
            *self.balances.lock().get(&account_id).unwrap_or(&0)
        }

        async fn apply_unconfirmed(
            &self,
            account_id: i64,
            amount: i64,
        ) -> Result<(), InsufficientFundsError> {
            let mut balances = self.balances.lock();
            let balance = balances.entry(account_id).or_insert(0);
            if *balance < amount {
                return Err(InsufficientFundsError);
            }
            *balance -= amount;
            Ok(())
        }

        async fn undo_unconfirmed(&self, account_id: i64, amount: i64) {
            *self.balances.lock().entry(account_id).or_insert(0) += amount;
        }
    }

    #[async_trait]
    impl ChainStore for TestChain {
        async fn contains_transaction(&self, id: TransactionId) -> bool {
            self.confirmed.lock().contains(&id)
        }

        async fn apply_transaction_ledger_effects(&self, _tx: &Transaction) -> Result<(), UndoNotSupportedError> {
            Ok(())
        }

        async fn undo_transaction_ledger_effects(&self, _tx: &Transaction) -> Result<(), UndoNotSupportedError> {
            Ok(())
        }
    }
}
