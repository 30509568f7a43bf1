//! Validation context
//!
//! Carries the optional cipher key; fields with a cipher rule fail when
//! no key is configured.

use super::crypto::StringCipher;

/// Context threaded through row validation
#[derive(Debug, Clone, Default)]
pub struct ValidateContext {
    cipher: Option<StringCipher>,
}

impl ValidateContext {
    /// Context with no cipher key
    pub fn new() -> Self {
        Self::default()
    }

    /// Context with a 32-byte cipher key for cipher-flagged fields
    pub fn with_cipher_key(key: [u8; 32]) -> Self {
        Self {
            cipher: Some(StringCipher::new(key)),
        }
    }

    /// The configured cipher, if any
    pub fn cipher(&self) -> Option<&StringCipher> {
        self.cipher.as_ref()
    }
}
