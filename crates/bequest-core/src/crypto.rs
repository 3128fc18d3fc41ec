//! Ed25519 keys and signatures.
//!
//! An [`Identity`] is the raw Ed25519 verifying key. Transactions are signed
//! over their bincode encoding; see
//! [`Transaction::sign`](crate::instruction::Transaction::sign).

use ed25519_dalek::{Signer, Verifier};
use std::fmt;

use crate::error::CryptoError;
use crate::types::Identity;

/// Ed25519 signing keypair.
pub struct KeyPair {
    signing_key: ed25519_dalek::SigningKey,
}

impl KeyPair {
    /// Generate a random keypair using the OS cryptographic RNG.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self {
            signing_key: ed25519_dalek::SigningKey::generate(&mut csprng),
        }
    }

    pub fn from_secret_bytes(bytes: [u8; 32]) -> Self {
        Self {
            signing_key: ed25519_dalek::SigningKey::from_bytes(&bytes),
        }
    }

    /// Parse a hex-encoded 32-byte secret, as stored in key files.
    pub fn from_secret_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s.trim()).map_err(|e| CryptoError::Serialization(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CryptoError::Serialization("secret key must be 32 bytes".into()))?;
        Ok(Self::from_secret_bytes(arr))
    }

    pub fn identity(&self) -> Identity {
        Identity(self.signing_key.verifying_key().to_bytes())
    }

    /// Raw secret bytes. Handle with care.
    pub fn secret_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl Clone for KeyPair {
    fn clone(&self) -> Self {
        Self::from_secret_bytes(self.secret_bytes())
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("identity", &self.identity())
            .finish_non_exhaustive()
    }
}

/// Verify `signature` over `message` against `signer`.
pub fn verify(signer: &Identity, message: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
    let vk = ed25519_dalek::VerifyingKey::from_bytes(signer.as_bytes())
        .map_err(|_| CryptoError::InvalidPublicKey)?;
    let sig_bytes: [u8; 64] = signature.try_into().map_err(|_| CryptoError::InvalidSignature)?;
    let sig = ed25519_dalek::Signature::from_bytes(&sig_bytes);
    vk.verify(message, &sig).map_err(|_| CryptoError::VerificationFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify() {
        let kp = KeyPair::generate();
        let sig = kp.sign(b"heartbeat");
        assert!(verify(&kp.identity(), b"heartbeat", &sig).is_ok());
    }

    #[test]
    fn verify_rejects_other_message() {
        let kp = KeyPair::from_secret_bytes([3u8; 32]);
        let sig = kp.sign(b"one");
        assert_eq!(verify(&kp.identity(), b"two", &sig), Err(CryptoError::VerificationFailed));
    }

    #[test]
    fn verify_rejects_other_signer() {
        let a = KeyPair::from_secret_bytes([1u8; 32]);
        let b = KeyPair::from_secret_bytes([2u8; 32]);
        let sig = a.sign(b"msg");
        assert_eq!(verify(&b.identity(), b"msg", &sig), Err(CryptoError::VerificationFailed));
    }

    #[test]
    fn verify_rejects_short_signature() {
        let kp = KeyPair::from_secret_bytes([1u8; 32]);
        assert_eq!(verify(&kp.identity(), b"msg", &[0u8; 10]), Err(CryptoError::InvalidSignature));
    }

    #[test]
    fn deterministic_from_secret() {
        let a = KeyPair::from_secret_bytes([42u8; 32]);
        let b = KeyPair::from_secret_bytes([42u8; 32]);
        assert_eq!(a.identity(), b.identity());
        assert_eq!(a.clone().identity(), a.identity());
    }

    #[test]
    fn secret_hex_roundtrip() {
        let kp = KeyPair::from_secret_bytes([8u8; 32]);
        let parsed = KeyPair::from_secret_hex(&hex::encode(kp.secret_bytes())).unwrap();
        assert_eq!(parsed.identity(), kp.identity());
        assert!(KeyPair::from_secret_hex("abcd").is_err());
    }
}
