//! Signature verification. The teacher carries `bls-signatures`/`blstrs` for Filecoin's curve;
//! this network uses ed25519 public-key cryptography for transactions and hallmarks, so the
//! primitive is sourced from the pack's `Ian-Reitsma-the-block` node (`net/mod.rs`), which reaches
//! for `ed25519-dalek` the same way. The verification call shape (verify a detached signature
//! against a message and a raw public key) follows the teacher's `recover_sig`/signature-checking
//! style in `msgpool::mod`: decode, verify, map failure to a domain error rather than panicking.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};

use crate::error::ValidationError;

/// A raw 32-byte ed25519 public key, as carried on the wire.
pub type PublicKeyBytes = [u8; 32];

/// A raw 64-byte ed25519 signature, as carried on the wire.
pub type SignatureBytes = [u8; 64];

/// Verifies `signature` over `message` under `public_key`. Any malformed key or signature is
/// treated the same as a verification failure; this is a pool-admission boundary, not a place to
/// distinguish attacker error from encoding bugs.
pub fn verify(
    public_key: &PublicKeyBytes,
    message: &[u8],
    signature: &SignatureBytes,
) -> Result<(), ValidationError> {
    let verifying_key =
        VerifyingKey::from_bytes(public_key).map_err(|_| ValidationError::BadSignature)?;
    let signature = Signature::from_bytes(signature);
    verifying_key
        .verify(message, &signature)
        .map_err(|_| ValidationError::BadSignature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};
    use rand::rngs::OsRng;

    #[test]
    fn round_trips_a_valid_signature() {
        let mut csprng = OsRng;
        let signing_key = SigningKey::generate(&mut csprng);
        let message = b"transfer 5 nhz";
        let signature = signing_key.sign(message);
        let public_key = signing_key.verifying_key().to_bytes();
        verify(&public_key, message, &signature.to_bytes()).unwrap();
    }

    #[test]
    fn rejects_a_tampered_message() {
        let mut csprng = OsRng;
        let signing_key = SigningKey::generate(&mut csprng);
        let signature = signing_key.sign(b"transfer 5 nhz");
        let public_key = signing_key.verifying_key().to_bytes();
        assert!(verify(&public_key, b"transfer 500 nhz", &signature.to_bytes()).is_err());
    }
}
