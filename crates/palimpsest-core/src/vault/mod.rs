//! Vault capability traits.
//!
//! The history service never touches ciphers directly; it is handed an
//! [`Encryptor`] and a [`Decryptor`] at construction time.
//!
//! # Security Note
//!
//! Implementations should ensure that:
//! - Secrets are never logged or exposed in error messages
//! - A wrong secret surfaces as `HistoryError::Authentication`, never as
//!   garbage plaintext

use std::fmt;

use async_trait::async_trait;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::content::{EncryptedEnvelope, NoteContent};
use crate::error::Result;

/// A vault password. Wiped from memory on drop; `Debug` is redacted.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct VaultSecret(String);

impl VaultSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for VaultSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VaultSecret(***)")
    }
}

impl From<&str> for VaultSecret {
    fn from(secret: &str) -> Self {
        Self::new(secret)
    }
}

/// Turns plaintext content into a vault envelope.
#[async_trait]
pub trait Encryptor: Send + Sync {
    async fn encrypt(&self, content: &NoteContent, secret: &VaultSecret)
    -> Result<EncryptedEnvelope>;
}

/// Opens a vault envelope.
#[async_trait]
pub trait Decryptor: Send + Sync {
    /// Fails with `HistoryError::Authentication` when `secret` is wrong.
    async fn decrypt(&self, envelope: &EncryptedEnvelope, secret: &VaultSecret)
    -> Result<NoteContent>;
}
