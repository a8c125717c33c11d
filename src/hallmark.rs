//! Hallmark parsing and weighting (§4.2). A hallmark is a signed blob binding a network host to
//! an account and a declared weight factor; verification follows the same shape as the teacher's
//! `recover_sig` in `msgpool::mod` — decode, recompute the signed message, verify, map failure to
//! a domain error — generalized from "recover a message's signing key" to "verify a detached
//! signature against a claimed public key."

use sha2::{Digest, Sha256};

use crate::constants::{MIN_HUB_EFFECTIVE_BALANCE, ONE_NHZ};
use crate::crypto::{self, PublicKeyBytes, SignatureBytes};
use crate::error::HallmarkError;

/// A parsed, not-yet-verified hallmark credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hallmark {
    pub account_public_key: PublicKeyBytes,
    pub host: String,
    pub weight_factor: i64,
    pub date: u32,
    pub nonce: u64,
    pub signature: SignatureBytes,
}

impl Hallmark {
    /// Decodes a hallmark from its hex-encoded wire form:
    /// `pubkey(32) | host_len(1) | host | weight_factor(8, LE) | date(4, LE) | nonce(8, LE) | signature(64)`.
    pub fn parse(hex_blob: &str) -> Result<Self, HallmarkError> {
        let bytes = hex::decode(hex_blob)
            .map_err(|e| HallmarkError::Malformed(format!("not valid hex: {e}")))?;
        let mut cursor = 0usize;
        let take = |cursor: &mut usize, n: usize, bytes: &[u8]| -> Result<Vec<u8>, HallmarkError> {
            let end = *cursor + n;
            let slice = bytes
                .get(*cursor..end)
                .ok_or_else(|| HallmarkError::Malformed("truncated hallmark blob".to_string()))?
                .to_vec();
            *cursor = end;
            Ok(slice)
        };

        let public_key_bytes = take(&mut cursor, 32, &bytes)?;
        let mut account_public_key = [0u8; 32];
        account_public_key.copy_from_slice(&public_key_bytes);

        let host_len_bytes = take(&mut cursor, 1, &bytes)?;
        let host_len = host_len_bytes[0] as usize;
        let host_bytes = take(&mut cursor, host_len, &bytes)?;
        let host = String::from_utf8(host_bytes)
            .map_err(|e| HallmarkError::Malformed(format!("host is not utf-8: {e}")))?;

        let weight_bytes = take(&mut cursor, 8, &bytes)?;
        let weight_factor = i64::from_le_bytes(weight_bytes.try_into().unwrap());

        let date_bytes = take(&mut cursor, 4, &bytes)?;
        let date = u32::from_le_bytes(date_bytes.try_into().unwrap());

        let nonce_bytes = take(&mut cursor, 8, &bytes)?;
        let nonce = u64::from_le_bytes(nonce_bytes.try_into().unwrap());

        let signature_bytes = take(&mut cursor, 64, &bytes)?;
        let mut signature = [0u8; 64];
        signature.copy_from_slice(&signature_bytes);

        Ok(Self {
            account_public_key,
            host,
            weight_factor,
            date,
            nonce,
            signature,
        })
    }

    /// The message the signature covers: every field except the signature itself, in wire order.
    fn signed_message(&self) -> Vec<u8> {
        let mut message = Vec::with_capacity(32 + 1 + self.host.len() + 8 + 4 + 8);
        message.extend_from_slice(&self.account_public_key);
        message.push(self.host.len() as u8);
        message.extend_from_slice(self.host.as_bytes());
        message.extend_from_slice(&self.weight_factor.to_le_bytes());
        message.extend_from_slice(&self.date.to_le_bytes());
        message.extend_from_slice(&self.nonce.to_le_bytes());
        message
    }

    /// Verifies the signature and that `declared_host` matches the hallmark's bound host.
    /// Accepting a hallmark whose host doesn't match the peer's actual address would let any
    /// holder of a valid hallmark vouch for an unrelated address.
    pub fn verify(&self, declared_host: &str) -> Result<(), HallmarkError> {
        if self.host != declared_host {
            return Err(HallmarkError::HostMismatch {
                hallmark_host: self.host.clone(),
                peer_host: declared_host.to_string(),
            });
        }
        crypto::verify(&self.account_public_key, &self.signed_message(), &self.signature)
            .map_err(|_| HallmarkError::BadSignature)
    }

    /// The account id this hallmark is bound to, using the same public-key-to-id projection as
    /// [`crate::transaction::Transaction::sender_account_id`], so a hallmark account and a
    /// transaction sender derived from the same key always agree on its id.
    pub fn account_id(&self) -> i64 {
        let digest = Sha256::digest(self.account_public_key);
        i64::from_le_bytes(digest[0..8].try_into().unwrap())
    }
}

/// Effective weight of a peer carrying `hallmark`, given the bound account's effective balance
/// (in atomic units). Returns 0 if the account falls below the hub minimum.
pub fn effective_weight(hallmark: &Hallmark, account_effective_balance: i64) -> i64 {
    if account_effective_balance < MIN_HUB_EFFECTIVE_BALANCE {
        return 0;
    }
    (account_effective_balance / ONE_NHZ).min(hallmark.weight_factor)
}
