//! Vault key file DTO.
//!
//! The vault never stores its password. It stores a known plaintext sealed
//! with it; a password is correct iff the envelope opens.
//!
//! ## Version History
//! - **1.0.0**: Initial schema

use serde::{Deserialize, Serialize};

use palimpsest_core::content::EncryptedEnvelope;
use palimpsest_core::error::{HistoryError, Result};

pub const VAULT_KEY_VERSION: &str = "1.0.0";

/// On-disk vault verifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultKeyV1_0_0 {
    pub schema_version: String,
    pub verifier: EncryptedEnvelope,
}

impl VaultKeyV1_0_0 {
    pub fn new(verifier: EncryptedEnvelope) -> Self {
        Self {
            schema_version: VAULT_KEY_VERSION.to_string(),
            verifier,
        }
    }

    pub fn into_verifier(self) -> Result<EncryptedEnvelope> {
        if !self.schema_version.starts_with("1.") {
            return Err(HistoryError::migration(format!(
                "Unsupported vault key version '{}'",
                self.schema_version
            )));
        }
        Ok(self.verifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palimpsest_core::content::{ContentType, KdfParams};

    #[test]
    fn test_vault_key_toml_roundtrip() {
        let key = VaultKeyV1_0_0::new(EncryptedEnvelope {
            algorithm: "aes-256-gcm/argon2id".to_string(),
            kdf: KdfParams {
                m_cost: 19456,
                t_cost: 2,
                p_cost: 1,
            },
            salt: "c2FsdA==".to_string(),
            nonce: "bm9uY2U=".to_string(),
            cipher: "Y2lwaGVy".to_string(),
            length: 16,
            content_type: ContentType::Tiny,
        });

        let text = toml::to_string(&key).unwrap();
        let parsed: VaultKeyV1_0_0 = toml::from_str(&text).unwrap();
        assert_eq!(parsed, key);
        assert_eq!(parsed.into_verifier().unwrap().length, 16);
    }
}
