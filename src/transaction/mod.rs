//! Transaction record and identity derivation (§3). Grounded on the teacher's `SignedMessage`
//! handling in `msgpool::mod` (`recover_sig`, `cid()`-style identity derivation from signed
//! bytes) — generalized from a CID to this network's 64-bit `id` / 32-byte `hash` split.

pub mod wire;

use sha2::{Digest, Sha256};

use crate::constants::{MAX_DEADLINE_MINUTES, MAX_PAYLOAD_LENGTH};
use crate::crypto::{PublicKeyBytes, SignatureBytes};
use crate::error::ValidationError;

/// 64-bit transaction identity, a lossy projection of [`TransactionHash`]. Distinct transactions
/// may collide on `id`; they may never collide on `hash`.
pub type TransactionId = u64;

/// Full 32-byte sha256 of a transaction's signed bytes. Used as the replay-prevention key.
pub type TransactionHash = [u8; 32];

/// Reference to an earlier transaction, in either of the two historical encodings this network
/// has used (§4.8's `ReferencedTransactionFullHash` fork).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferencedTransaction {
    None,
    Id(i64),
    FullHash(TransactionHash),
}

/// The pre-fractional-block (`i32`) and post-fractional-block (`i64`) amount/fee encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtomicAmount {
    Narrow(i32),
    Wide(i64),
}

impl AtomicAmount {
    pub fn as_i64(self) -> i64 {
        match self {
            AtomicAmount::Narrow(v) => i64::from(v),
            AtomicAmount::Wide(v) => v,
        }
    }
}

/// An immutable, fully parsed transaction.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub type_id: u8,
    pub subtype_id: u8,
    pub timestamp: u32,
    pub deadline_minutes: u16,
    pub sender_public_key: PublicKeyBytes,
    pub recipient_id: i64,
    pub amount: AtomicAmount,
    pub fee: AtomicAmount,
    pub referenced_transaction: ReferencedTransaction,
    pub signature: SignatureBytes,
    pub attachment: Vec<u8>,
    /// Everything the signature covers, i.e. the wire encoding with the signature field zeroed.
    signed_bytes: Vec<u8>,
}

impl Transaction {
    pub fn new(
        type_id: u8,
        subtype_id: u8,
        timestamp: u32,
        deadline_minutes: u16,
        sender_public_key: PublicKeyBytes,
        recipient_id: i64,
        amount: AtomicAmount,
        fee: AtomicAmount,
        referenced_transaction: ReferencedTransaction,
        signature: SignatureBytes,
        attachment: Vec<u8>,
        signed_bytes: Vec<u8>,
    ) -> Self {
        Self {
            type_id,
            subtype_id,
            timestamp,
            deadline_minutes,
            sender_public_key,
            recipient_id,
            amount,
            fee,
            referenced_transaction,
            signature,
            attachment,
            signed_bytes,
        }
    }

    /// Full 32-byte sha256 of the signed bytes.
    pub fn hash(&self) -> TransactionHash {
        let mut hasher = Sha256::new();
        hasher.update(&self.signed_bytes);
        hasher.finalize().into()
    }

    /// First 8 little-endian bytes of [`Transaction::hash`], interpreted as a `u64`.
    pub fn id(&self) -> TransactionId {
        let hash = self.hash();
        u64::from_le_bytes(hash[0..8].try_into().unwrap())
    }

    pub fn string_id(&self) -> String {
        self.id().to_string()
    }

    pub fn expiration(&self) -> u32 {
        self.timestamp
            .saturating_add(u32::from(self.deadline_minutes) * 60)
    }

    /// Clock-gate check (§4.5 step 1): not too far in the future, not already expired, deadline
    /// within bounds.
    pub fn check_clock(&self, now: u32) -> Result<(), ValidationError> {
        if self.timestamp > now + 15 {
            return Err(ValidationError::TimestampInFuture { timestamp: self.timestamp, now });
        }
        if self.expiration() < now {
            return Err(ValidationError::Expired { expiration: self.expiration(), now });
        }
        if self.deadline_minutes > MAX_DEADLINE_MINUTES {
            return Err(ValidationError::DeadlineTooLong(self.deadline_minutes));
        }
        Ok(())
    }

    pub fn verify_signature(&self) -> Result<(), ValidationError> {
        crate::crypto::verify(&self.sender_public_key, &self.signed_bytes, &self.signature)
    }

    /// Attachment well-formedness (§4.5 step 1, re-run at §4.7's expiration and rebroadcast
    /// sweeps): the only attachment check this network defines in the absence of a concrete
    /// per-type/subtype schema catalog (see DESIGN.md).
    pub fn attachment_is_valid(&self) -> Result<(), ValidationError> {
        if self.attachment.len() > MAX_PAYLOAD_LENGTH {
            return Err(ValidationError::BadAttachment {
                ty: self.type_id,
                subtype: self.subtype_id,
                reason: "attachment exceeds the maximum payload length".to_string(),
            });
        }
        Ok(())
    }

    /// Derives the sender's account id from their public key: first 8 little-endian bytes of
    /// `sha256(public_key)`, the same projection used for transaction `id` from `hash`.
    pub fn sender_account_id(&self) -> i64 {
        let digest = Sha256::digest(self.sender_public_key);
        i64::from_le_bytes(digest[0..8].try_into().unwrap())
    }
}

/// Cached replay-index entry (§3's `TransactionHashInfo`): enough to prune by expiration without
/// re-parsing the original transaction.
#[derive(Debug, Clone, Copy)]
pub struct TransactionHashInfo {
    pub transaction_id: TransactionId,
    pub expiration: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_transaction(timestamp: u32, deadline_minutes: u16) -> Transaction {
        Transaction::new(
            0,
            0,
            timestamp,
            deadline_minutes,
            [1u8; 32],
            42,
            AtomicAmount::Wide(100),
            AtomicAmount::Wide(1),
            ReferencedTransaction::None,
            [0u8; 64],
            Vec::new(),
            b"fixture-signed-bytes".to_vec(),
        )
    }

    #[test]
    fn id_is_a_lossy_projection_of_hash() {
        let tx = sample_transaction(1000, 60);
        let hash = tx.hash();
        assert_eq!(tx.id(), u64::from_le_bytes(hash[0..8].try_into().unwrap()));
    }

    #[test]
    fn expiration_is_timestamp_plus_deadline_minutes() {
        let tx = sample_transaction(1000, 10);
        assert_eq!(tx.expiration(), 1000 + 600);
    }

    #[test]
    fn clock_gate_rejects_an_overlong_deadline() {
        let tx = sample_transaction(1000, MAX_DEADLINE_MINUTES + 1);
        assert!(matches!(
            tx.check_clock(1000),
            Err(ValidationError::DeadlineTooLong(_))
        ));
    }

    #[test]
    fn clock_gate_rejects_a_future_timestamp() {
        let tx = sample_transaction(2000, 60);
        assert!(matches!(
            tx.check_clock(1000),
            Err(ValidationError::TimestampInFuture { .. })
        ));
    }
}
