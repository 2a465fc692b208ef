//! Symmetric secret envelope for the settings-backed store
//!
//! Secrets are sealed with AES-256-GCM and stored as
//! `base64(nonce || ciphertext)`. The key is supplied by the caller, either
//! directly or derived from a passphrase; there is no compiled-in key.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// AES-GCM nonce size in bytes
const NONCE_LEN: usize = 12;

/// Errors from sealing or opening a secret envelope
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("encryption failed")]
    Encrypt,

    #[error("decryption failed: {0}")]
    Decrypt(String),

    #[error("envelope is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("envelope is truncated: {0} bytes")]
    Truncated(usize),

    #[error("decrypted secret is not valid UTF-8")]
    NotUtf8,
}

pub type CryptoResult<T> = Result<T, CryptoError>;

/// Seals and opens secret envelopes with a fixed 256-bit key
#[derive(Clone)]
pub struct SecretCipher {
    cipher: Aes256Gcm,
}

impl SecretCipher {
    /// Create a cipher from a raw 256-bit key
    pub fn from_key(key: [u8; 32]) -> Self {
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key)),
        }
    }

    /// Create a cipher from a passphrase (SHA-256 key derivation)
    ///
    /// Deterministic: the same passphrase always yields the same key, so
    /// envelopes survive process restarts.
    pub fn from_passphrase(passphrase: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(passphrase.as_bytes());
        let digest = hasher.finalize();
        let mut key = [0u8; 32];
        key.copy_from_slice(&digest);
        Self::from_key(key)
    }

    /// Seal a plaintext secret into an envelope string
    ///
    /// A fresh random nonce is generated per call, so sealing the same
    /// secret twice yields different envelopes.
    pub fn encrypt(&self, plaintext: &str) -> CryptoResult<String> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| CryptoError::Encrypt)?;

        let mut envelope = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        envelope.extend_from_slice(&nonce);
        envelope.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(envelope))
    }

    /// Open an envelope string back into the plaintext secret
    pub fn decrypt(&self, envelope: &str) -> CryptoResult<String> {
        let bytes = BASE64.decode(envelope)?;
        if bytes.len() <= NONCE_LEN {
            return Err(CryptoError::Truncated(bytes.len()));
        }

        let (nonce, ciphertext) = bytes.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|e| CryptoError::Decrypt(e.to_string()))?;

        String::from_utf8(plaintext).map_err(|_| CryptoError::NotUtf8)
    }
}

impl std::fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never expose key material
        f.debug_struct("SecretCipher").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cipher() -> SecretCipher {
        SecretCipher::from_passphrase("test-passphrase")
    }

    #[test]
    fn test_round_trip() {
        let cipher = test_cipher();
        for secret in ["sk-ant-REDACTED", "zai-abc1234567", "", "🔑 unicode"] {
            let envelope = cipher.encrypt(secret).unwrap();
            assert_eq!(cipher.decrypt(&envelope).unwrap(), secret);
        }
    }

    #[test]
    fn test_fresh_nonce_per_encryption() {
        let cipher = test_cipher();
        let a = cipher.encrypt("same secret").unwrap();
        let b = cipher.encrypt("same secret").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_key_fails() {
        let envelope = test_cipher().encrypt("secret").unwrap();
        let other = SecretCipher::from_passphrase("different-passphrase");
        assert!(matches!(other.decrypt(&envelope), Err(CryptoError::Decrypt(_))));
    }

    #[test]
    fn test_garbage_envelope_fails() {
        let cipher = test_cipher();
        assert!(matches!(cipher.decrypt("!!not base64!!"), Err(CryptoError::Encoding(_))));
        assert!(matches!(cipher.decrypt("AAAA"), Err(CryptoError::Truncated(_))));
    }

    #[test]
    fn test_passphrase_derivation_is_stable() {
        let a = SecretCipher::from_passphrase("stable");
        let b = SecretCipher::from_passphrase("stable");
        let envelope = a.encrypt("secret").unwrap();
        assert_eq!(b.decrypt(&envelope).unwrap(), "secret");
    }
}
