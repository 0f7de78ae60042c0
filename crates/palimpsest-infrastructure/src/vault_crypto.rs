//! Vault crypto: AES-256-GCM with an Argon2id-derived key.
//!
//! Every envelope gets a fresh salt and nonce, so the key is derived per
//! envelope and only the password needs to be kept. Derivation is
//! deliberately slow; it runs on the blocking pool.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use rand::{RngCore, rngs::OsRng};
use zeroize::Zeroizing;

use palimpsest_core::config::VaultConfig;
use palimpsest_core::content::{EncryptedEnvelope, KdfParams, NoteContent};
use palimpsest_core::error::{HistoryError, Result};
use palimpsest_core::vault::{Decryptor, Encryptor, VaultSecret};

/// Algorithm tag written into every envelope.
pub const ENVELOPE_ALGORITHM: &str = "aes-256-gcm/argon2id";

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;

/// How far an envelope's KDF costs may exceed the local settings.
const KDF_CEILING_FACTOR: u32 = 4;

/// Highest KDF costs an incoming envelope may ask for.
///
/// Envelopes arrive from other replicas, so their costs are bounded by the
/// larger of the local and default settings times [`KDF_CEILING_FACTOR`].
fn kdf_ceiling(local: KdfParams) -> KdfParams {
    let defaults = VaultConfig::default().kdf_params();
    KdfParams {
        m_cost: local.m_cost.max(defaults.m_cost).saturating_mul(KDF_CEILING_FACTOR),
        t_cost: local.t_cost.max(defaults.t_cost).saturating_mul(KDF_CEILING_FACTOR),
        p_cost: local.p_cost.max(defaults.p_cost).saturating_mul(KDF_CEILING_FACTOR),
    }
}

fn check_kdf(kdf: KdfParams, ceiling: KdfParams) -> Result<()> {
    if kdf.m_cost > ceiling.m_cost
        || kdf.t_cost > ceiling.t_cost
        || kdf.p_cost > ceiling.p_cost
    {
        return Err(HistoryError::encryption(format!(
            "Envelope KDF costs (m={}, t={}, p={}) exceed the allowed ceiling (m={}, t={}, p={})",
            kdf.m_cost, kdf.t_cost, kdf.p_cost, ceiling.m_cost, ceiling.t_cost, ceiling.p_cost
        )));
    }
    Ok(())
}

fn derive_key(password: &str, salt: &[u8], kdf: KdfParams) -> Result<Zeroizing<[u8; 32]>> {
    use argon2::{Algorithm, Argon2, Params, Version};

    let params = Params::new(kdf.m_cost, kdf.t_cost, kdf.p_cost, Some(32))
        .map_err(|e| HistoryError::encryption(format!("Invalid Argon2 parameters: {}", e)))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = Zeroizing::new([0u8; 32]);
    argon2
        .hash_password_into(password.as_bytes(), salt, key.as_mut())
        .map_err(|e| HistoryError::encryption(format!("Argon2id key derivation failed: {}", e)))?;
    Ok(key)
}

fn seal(content: &NoteContent, password: &str, kdf: KdfParams) -> Result<EncryptedEnvelope> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);

    let key = derive_key(password, &salt, kdf)?;
    let cipher = Aes256Gcm::new_from_slice(key.as_ref())
        .map_err(|e| HistoryError::encryption(format!("Failed to create AES cipher: {}", e)))?;

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), content.data.as_bytes())
        .map_err(|e| HistoryError::encryption(format!("Encryption failed: {}", e)))?;

    Ok(EncryptedEnvelope {
        algorithm: ENVELOPE_ALGORITHM.to_string(),
        kdf,
        salt: STANDARD.encode(salt),
        nonce: STANDARD.encode(nonce_bytes),
        cipher: STANDARD.encode(ciphertext),
        length: content.data.len(),
        content_type: content.content_type,
    })
}

fn open(envelope: &EncryptedEnvelope, password: &str, ceiling: KdfParams) -> Result<NoteContent> {
    if envelope.algorithm != ENVELOPE_ALGORITHM {
        return Err(HistoryError::encryption(format!(
            "Unsupported envelope algorithm '{}'",
            envelope.algorithm
        )));
    }
    check_kdf(envelope.kdf, ceiling)?;

    let salt = decode_field("salt", &envelope.salt)?;
    let nonce_bytes = decode_field("nonce", &envelope.nonce)?;
    let ciphertext = decode_field("cipher", &envelope.cipher)?;
    if nonce_bytes.len() != NONCE_LEN {
        return Err(HistoryError::encryption("Envelope nonce has the wrong length"));
    }

    let key = derive_key(password, &salt, envelope.kdf)?;
    let cipher = Aes256Gcm::new_from_slice(key.as_ref())
        .map_err(|e| HistoryError::encryption(format!("Failed to create AES cipher: {}", e)))?;

    // A tag mismatch means a wrong password or a tampered envelope
    let plaintext = cipher
        .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
        .map_err(|_| HistoryError::authentication("Wrong vault password or corrupted envelope"))?;

    let data = String::from_utf8(plaintext)
        .map_err(|_| HistoryError::encryption("Decrypted content is not valid UTF-8"))?;

    Ok(NoteContent {
        content_type: envelope.content_type,
        data,
    })
}

fn decode_field(name: &str, value: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(value)
        .map_err(|e| HistoryError::encryption(format!("Envelope {} is not base64: {}", name, e)))
}

/// AES-256-GCM vault crypto with Argon2id key derivation.
#[derive(Debug, Clone)]
pub struct AesGcmVaultCrypto {
    kdf: KdfParams,
    ceiling: KdfParams,
}

impl AesGcmVaultCrypto {
    pub fn new(config: &VaultConfig) -> Self {
        let kdf = config.kdf_params();
        Self {
            kdf,
            ceiling: kdf_ceiling(kdf),
        }
    }
}

impl Default for AesGcmVaultCrypto {
    fn default() -> Self {
        Self::new(&VaultConfig::default())
    }
}

#[async_trait]
impl Encryptor for AesGcmVaultCrypto {
    async fn encrypt(
        &self,
        content: &NoteContent,
        secret: &VaultSecret,
    ) -> Result<EncryptedEnvelope> {
        let content = content.clone();
        let password = Zeroizing::new(secret.expose().to_string());
        let kdf = self.kdf;

        tokio::task::spawn_blocking(move || seal(&content, password.as_str(), kdf))
            .await
            .map_err(|e| HistoryError::internal(format!("Encryption task failed: {}", e)))?
    }
}

#[async_trait]
impl Decryptor for AesGcmVaultCrypto {
    async fn decrypt(
        &self,
        envelope: &EncryptedEnvelope,
        secret: &VaultSecret,
    ) -> Result<NoteContent> {
        let envelope = envelope.clone();
        let password = Zeroizing::new(secret.expose().to_string());
        let ceiling = self.ceiling;

        tokio::task::spawn_blocking(move || open(&envelope, password.as_str(), ceiling))
            .await
            .map_err(|e| HistoryError::internal(format!("Decryption task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_crypto() -> AesGcmVaultCrypto {
        AesGcmVaultCrypto::new(&VaultConfig {
            argon2_m_cost: 64,
            argon2_t_cost: 1,
            argon2_p_cost: 1,
        })
    }

    #[tokio::test]
    async fn test_roundtrip_encrypt_decrypt() {
        let crypto = fast_crypto();
        let secret = VaultSecret::new("password");
        let content = NoteContent::tiny("<p>hello world</p>");

        let envelope = crypto.encrypt(&content, &secret).await.unwrap();
        assert_eq!(envelope.algorithm, ENVELOPE_ALGORITHM);
        assert_eq!(envelope.length, content.data.len());
        assert!(!envelope.cipher.contains("hello"));

        let decrypted = crypto.decrypt(&envelope, &secret).await.unwrap();
        assert_eq!(decrypted, content);
    }

    #[tokio::test]
    async fn test_wrong_password_is_authentication_error() {
        let crypto = fast_crypto();
        let content = NoteContent::markdown("secret data");

        let envelope = crypto
            .encrypt(&content, &VaultSecret::new("correct"))
            .await
            .unwrap();
        let err = crypto
            .decrypt(&envelope, &VaultSecret::new("wrong"))
            .await
            .unwrap_err();

        assert!(err.is_authentication());
    }

    #[tokio::test]
    async fn test_tampered_cipher_fails() {
        let crypto = fast_crypto();
        let secret = VaultSecret::new("pw");
        let mut envelope = crypto
            .encrypt(&NoteContent::tiny("data"), &secret)
            .await
            .unwrap();

        let mut raw = STANDARD.decode(&envelope.cipher).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0xFF;
        envelope.cipher = STANDARD.encode(raw);

        assert!(crypto.decrypt(&envelope, &secret).await.is_err());
    }

    #[tokio::test]
    async fn test_oversized_kdf_costs_are_refused() {
        let crypto = fast_crypto();
        let secret = VaultSecret::new("pw");
        let envelope = crypto
            .encrypt(&NoteContent::tiny("data"), &secret)
            .await
            .unwrap();

        // Argon2 accepts this memory cost and would try to allocate ~256 GiB
        let mut hostile = envelope.clone();
        hostile.kdf.m_cost = 0x0FFF_FFFF;
        let err = crypto.decrypt(&hostile, &secret).await.unwrap_err();
        assert!(matches!(err, HistoryError::Encryption(_)));

        let mut slow = envelope.clone();
        slow.kdf.t_cost = u32::MAX;
        assert!(crypto.decrypt(&slow, &secret).await.is_err());

        // Default-strength envelopes from another replica still open
        let peer = AesGcmVaultCrypto::default();
        let from_peer = peer.encrypt(&NoteContent::tiny("peer"), &secret).await.unwrap();
        assert_eq!(
            crypto.decrypt(&from_peer, &secret).await.unwrap(),
            NoteContent::tiny("peer")
        );
    }

    #[tokio::test]
    async fn test_fresh_salt_and_nonce_per_envelope() {
        let crypto = fast_crypto();
        let secret = VaultSecret::new("pw");
        let content = NoteContent::tiny("same");

        let a = crypto.encrypt(&content, &secret).await.unwrap();
        let b = crypto.encrypt(&content, &secret).await.unwrap();

        assert_ne!(a.salt, b.salt);
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.cipher, b.cipher);
    }
}
