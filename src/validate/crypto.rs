//! Hash and cipher support for string rules
//!
//! The hash rule replaces a value with a one-way argon2 password hash.
//! The cipher rule replaces it with a reversible ChaCha20-Poly1305
//! ciphertext, transported as base64 with the 12-byte nonce prefixed.

use argon2::password_hash::{rand_core::OsRng, PasswordHasher, SaltString};
use argon2::Argon2;
use base64::{engine::general_purpose, Engine as _};
use chacha20poly1305::aead::Aead;
use chacha20poly1305::{ChaCha20Poly1305, Key, KeyInit, Nonce};
use rand::RngCore;
use std::fmt;

use super::errors::{FieldResult, ValidationError};

/// Length of the nonce prefixed to every ciphertext
const NONCE_LEN: usize = 12;

/// Hashes a value one-way. The output replaces the original value.
pub fn hash_value(value: &str) -> FieldResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(value.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| ValidationError::HashingFailed)
}

/// Reversible string cipher keyed with 32 bytes
#[derive(Clone)]
pub struct StringCipher {
    key: [u8; 32],
}

impl fmt::Debug for StringCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StringCipher")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl StringCipher {
    /// Creates a cipher from a 32-byte key
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Encrypts a value; output is base64(nonce || ciphertext)
    pub fn encrypt(&self, plaintext: &str) -> FieldResult<String> {
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&self.key));
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| ValidationError::CipherFailed("encryption failed".into()))?;

        let mut out = nonce_bytes.to_vec();
        out.extend_from_slice(&ciphertext);
        Ok(general_purpose::STANDARD.encode(out))
    }

    /// Decrypts a value produced by [`StringCipher::encrypt`]
    pub fn decrypt(&self, encoded: &str) -> FieldResult<String> {
        let raw = general_purpose::STANDARD
            .decode(encoded)
            .map_err(|_| ValidationError::CipherFailed("invalid base64".into()))?;
        if raw.len() <= NONCE_LEN {
            return Err(ValidationError::CipherFailed("ciphertext too short".into()));
        }

        let (nonce_bytes, ciphertext) = raw.split_at(NONCE_LEN);
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&self.key));
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| ValidationError::CipherFailed("decryption failed".into()))?;

        String::from_utf8(plaintext)
            .map_err(|_| ValidationError::CipherFailed("plaintext is not UTF-8".into()))
    }
}
