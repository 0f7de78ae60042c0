//! Note content domain models.
//!
//! A content blob is either the plaintext body of a note or a vault envelope
//! wrapping it. Both shapes live in [`ContentPayload`] so every consumer has
//! to handle the encrypted case explicitly.

use serde::{Deserialize, Serialize};

/// Known kinds of note bodies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// HTML produced by the rich-text editor.
    #[default]
    Tiny,
    /// Markdown source.
    Markdown,
}

/// Plaintext body of a note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteContent {
    /// Kind of body stored in `data`.
    #[serde(rename = "type")]
    pub content_type: ContentType,
    /// The body itself.
    pub data: String,
}

impl NoteContent {
    /// Creates rich-text (HTML) content.
    pub fn tiny(data: impl Into<String>) -> Self {
        Self {
            content_type: ContentType::Tiny,
            data: data.into(),
        }
    }

    /// Creates markdown content.
    pub fn markdown(data: impl Into<String>) -> Self {
        Self {
            content_type: ContentType::Markdown,
            data: data.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Key derivation parameters recorded alongside an envelope.
///
/// Stored with every envelope so it can be opened with nothing but the
/// password, even after the vault's defaults change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub m_cost: u32,
    /// Iterations.
    pub t_cost: u32,
    /// Lanes.
    pub p_cost: u32,
}

/// Ciphertext produced by the vault for a single [`NoteContent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedEnvelope {
    /// Cipher identifier, e.g. `"aes-256-gcm/argon2id"`.
    pub algorithm: String,
    pub kdf: KdfParams,
    /// Base64 KDF salt.
    pub salt: String,
    /// Base64 AEAD nonce.
    pub nonce: String,
    /// Base64 ciphertext including the authentication tag.
    pub cipher: String,
    /// Plaintext length in bytes.
    pub length: usize,
    /// Kind of the wrapped content, kept in the clear.
    #[serde(rename = "type")]
    pub content_type: ContentType,
}

/// What a content blob holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ContentPayload {
    Plain(NoteContent),
    Encrypted(EncryptedEnvelope),
}

impl ContentPayload {
    pub fn is_encrypted(&self) -> bool {
        matches!(self, ContentPayload::Encrypted(_))
    }

    pub fn content_type(&self) -> ContentType {
        match self {
            ContentPayload::Plain(content) => content.content_type,
            ContentPayload::Encrypted(envelope) => envelope.content_type,
        }
    }

    /// Returns the plaintext, if this payload is not encrypted.
    pub fn as_plain(&self) -> Option<&NoteContent> {
        match self {
            ContentPayload::Plain(content) => Some(content),
            ContentPayload::Encrypted(_) => None,
        }
    }

    /// Returns the envelope, if this payload is encrypted.
    pub fn as_encrypted(&self) -> Option<&EncryptedEnvelope> {
        match self {
            ContentPayload::Plain(_) => None,
            ContentPayload::Encrypted(envelope) => Some(envelope),
        }
    }
}

impl From<NoteContent> for ContentPayload {
    fn from(content: NoteContent) -> Self {
        ContentPayload::Plain(content)
    }
}

impl From<EncryptedEnvelope> for ContentPayload {
    fn from(envelope: EncryptedEnvelope) -> Self {
        ContentPayload::Encrypted(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_payload_json_shape() {
        let payload = ContentPayload::from(NoteContent::tiny("<p>hi</p>"));
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["kind"], "plain");
        assert_eq!(json["type"], "tiny");
        assert_eq!(json["data"], "<p>hi</p>");
    }

    #[test]
    fn test_encrypted_payload_reports_type() {
        let envelope = EncryptedEnvelope {
            algorithm: "aes-256-gcm/argon2id".to_string(),
            kdf: KdfParams {
                m_cost: 8,
                t_cost: 1,
                p_cost: 1,
            },
            salt: "c2FsdA==".to_string(),
            nonce: "bm9uY2U=".to_string(),
            cipher: "Y2lwaGVy".to_string(),
            length: 6,
            content_type: ContentType::Markdown,
        };
        let payload = ContentPayload::from(envelope);

        assert!(payload.is_encrypted());
        assert!(payload.as_plain().is_none());
        assert_eq!(payload.content_type(), ContentType::Markdown);

        let json = serde_json::to_string(&payload).unwrap();
        let back: ContentPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn test_content_type_defaults_to_tiny() {
        assert_eq!(ContentType::default(), ContentType::Tiny);
    }

    #[test]
    fn test_unknown_content_type_is_rejected() {
        let json = r#"{"kind":"plain","type":"html5","data":"x"}"#;
        assert!(serde_json::from_str::<ContentPayload>(json).is_err());
    }
}
