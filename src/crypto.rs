//! Cryptographic utilities for the persisted session file.
//!
//! Session cookies are as good as a password. When a key is configured, the cookie
//! file is stored encrypted with AES-256-GCM.

use aes_gcm::{
    aead::{generic_array::typenum::U12, Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use log::debug;

use crate::error::{Result, ScraperError};

/// The length of the nonce in bytes (96 bits for AES-GCM)
const NONCE_LENGTH: usize = 12;

/// AES-256-GCM cipher for the cookie file.
#[derive(Clone)]
pub struct CookieCipher {
    key: [u8; 32],
}

impl CookieCipher {
    /// Builds a cipher from a 32-byte key encoded as a 64-character hex string.
    ///
    /// # Returns
    ///
    /// - `Ok(CookieCipher)`: The cipher
    /// - `Err(ScraperError::Crypto)`: If the key is invalid hex or the wrong length
    pub fn from_hex_key(key_hex: &str) -> Result<Self> {
        let key_bytes = hex::decode(key_hex.trim()).map_err(|e| {
            ScraperError::Crypto(format!(
                "cookie key is not valid hex: {}. Generate a key with: openssl rand -hex 32",
                e
            ))
        })?;

        if key_bytes.len() != 32 {
            return Err(ScraperError::Crypto(format!(
                "cookie key must be exactly 32 bytes (64 hex chars), got {} bytes",
                key_bytes.len()
            )));
        }

        let mut key: [u8; 32] = [0u8; 32];
        key.copy_from_slice(&key_bytes);
        Ok(CookieCipher { key })
    }

    /// Encrypts `plaintext` with a fresh random nonce.
    ///
    /// The output format is hex(nonce (12 bytes) || ciphertext || auth_tag).
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String> {
        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| ScraperError::Crypto(e.to_string()))?;

        let mut nonce_bytes = [0u8; NONCE_LENGTH];
        getrandom::getrandom(&mut nonce_bytes)
            .map_err(|e| ScraperError::Crypto(format!("Failed to generate random nonce: {}", e)))?;
        let nonce: Nonce<U12> = nonce_bytes.into();

        let ciphertext = cipher
            .encrypt(&nonce, plaintext)
            .map_err(|e| ScraperError::Crypto(format!("Encryption failed: {}", e)))?;

        let mut result = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
        result.extend_from_slice(&nonce_bytes);
        result.extend_from_slice(&ciphertext);

        debug!("Encrypted {} bytes of session data", plaintext.len());
        Ok(hex::encode(result))
    }

    /// Decrypts the output of [`CookieCipher::encrypt`].
    pub fn decrypt(&self, encrypted_hex: &str) -> Result<Vec<u8>> {
        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| ScraperError::Crypto(e.to_string()))?;

        let encrypted_bytes = hex::decode(encrypted_hex.trim())
            .map_err(|e| ScraperError::Crypto(format!("Invalid hex in cookie file: {}", e)))?;

        if encrypted_bytes.len() < NONCE_LENGTH {
            return Err(ScraperError::Crypto(
                "Encrypted cookie file is too short".to_string(),
            ));
        }

        let (nonce_bytes, ciphertext) = encrypted_bytes.split_at(NONCE_LENGTH);
        let nonce_array: [u8; NONCE_LENGTH] = nonce_bytes
            .try_into()
            .map_err(|_| ScraperError::Crypto("Invalid nonce length".to_string()))?;
        let nonce: Nonce<U12> = nonce_array.into();

        let plaintext = cipher.decrypt(&nonce, ciphertext).map_err(|_| {
            ScraperError::Crypto("Decryption failed - wrong key or corrupted data".to_string())
        })?;

        debug!("Cookie file decrypted successfully");
        Ok(plaintext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let cipher = CookieCipher::from_hex_key(TEST_KEY).unwrap();

        let original = br#"[{"name":"ct0","value":"abc"}]"#;
        let encrypted = cipher.encrypt(original).unwrap();
        assert!(!encrypted.contains("ct0"));

        let decrypted = cipher.decrypt(&encrypted).unwrap();
        assert_eq!(decrypted, original);
    }

    #[test]
    fn test_different_encryptions_produce_different_output() {
        let cipher = CookieCipher::from_hex_key(TEST_KEY).unwrap();

        let encrypted1 = cipher.encrypt(b"cookies").unwrap();
        let encrypted2 = cipher.encrypt(b"cookies").unwrap();

        // Due to random nonce, same plaintext should produce different ciphertext
        assert_ne!(encrypted1, encrypted2);
        assert_eq!(cipher.decrypt(&encrypted1).unwrap(), b"cookies");
        assert_eq!(cipher.decrypt(&encrypted2).unwrap(), b"cookies");
    }

    #[test]
    fn test_wrong_key_fails_to_decrypt() {
        let cipher = CookieCipher::from_hex_key(TEST_KEY).unwrap();
        let other = CookieCipher::from_hex_key(&"ab".repeat(32)).unwrap();

        let encrypted = cipher.encrypt(b"cookies").unwrap();
        assert!(matches!(
            other.decrypt(&encrypted),
            Err(ScraperError::Crypto(_))
        ));
    }

    #[test]
    fn test_short_key_is_rejected() {
        assert!(matches!(
            CookieCipher::from_hex_key("abcd"),
            Err(ScraperError::Crypto(_))
        ));
        assert!(matches!(
            CookieCipher::from_hex_key("not hex"),
            Err(ScraperError::Crypto(_))
        ));
    }
}
