//! Engine configuration.
//!
//! Loaded from `palimpsest.toml`; every field has a default so a missing
//! file or section is valid.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::content::KdfParams;
use crate::error::{HistoryError, Result};

/// Default number of sessions retained per note.
pub const DEFAULT_RETENTION_LIMIT: usize = 100;

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct PalimpsestConfig {
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub vault: VaultConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl PalimpsestConfig {
    /// Rejects values the engine cannot honour.
    pub fn validate(&self) -> Result<()> {
        self.history.validate()?;
        self.vault.validate()
    }
}

/// Retention policy.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct HistoryConfig {
    /// Sessions kept per note unless overridden
    #[serde(default = "default_retention_limit")]
    pub retention_limit: usize,
    /// Per-note overrides, keyed by note id
    #[serde(default)]
    pub per_note: HashMap<String, usize>,
}

fn default_retention_limit() -> usize {
    DEFAULT_RETENTION_LIMIT
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            retention_limit: DEFAULT_RETENTION_LIMIT,
            per_note: HashMap::new(),
        }
    }
}

impl HistoryConfig {
    pub fn with_limit(retention_limit: usize) -> Self {
        Self {
            retention_limit,
            ..Self::default()
        }
    }

    /// Effective retention limit for a note.
    pub fn limit_for(&self, note_id: &str) -> usize {
        self.per_note
            .get(note_id)
            .copied()
            .unwrap_or(self.retention_limit)
    }

    pub fn validate(&self) -> Result<()> {
        if self.retention_limit == 0 {
            return Err(HistoryError::config("history.retention_limit must be at least 1"));
        }
        if let Some((note_id, _)) = self.per_note.iter().find(|(_, limit)| **limit == 0) {
            return Err(HistoryError::config(format!(
                "history.per_note limit for '{}' must be at least 1",
                note_id
            )));
        }
        Ok(())
    }
}

/// Argon2id cost parameters used for new envelopes.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct VaultConfig {
    /// Memory cost in KiB
    #[serde(default = "default_m_cost")]
    pub argon2_m_cost: u32,
    #[serde(default = "default_t_cost")]
    pub argon2_t_cost: u32,
    #[serde(default = "default_p_cost")]
    pub argon2_p_cost: u32,
}

fn default_m_cost() -> u32 {
    19_456
}

fn default_t_cost() -> u32 {
    2
}

fn default_p_cost() -> u32 {
    1
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            argon2_m_cost: default_m_cost(),
            argon2_t_cost: default_t_cost(),
            argon2_p_cost: default_p_cost(),
        }
    }
}

impl VaultConfig {
    pub fn kdf_params(&self) -> KdfParams {
        KdfParams {
            m_cost: self.argon2_m_cost,
            t_cost: self.argon2_t_cost,
            p_cost: self.argon2_p_cost,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.argon2_t_cost == 0 || self.argon2_p_cost == 0 {
            return Err(HistoryError::config(
                "vault.argon2_t_cost and vault.argon2_p_cost must be at least 1",
            ));
        }
        if self.argon2_m_cost < 8 * self.argon2_p_cost {
            return Err(HistoryError::config(
                "vault.argon2_m_cost must be at least 8 KiB per lane",
            ));
        }
        Ok(())
    }
}

/// Where durable state lives.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageConfig {
    /// Overrides the platform data directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}
