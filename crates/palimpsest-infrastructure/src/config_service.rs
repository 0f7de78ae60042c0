//! Configuration service implementation.
//!
//! Loads the engine configuration from `palimpsest.toml`.

use std::path::{Path, PathBuf};

use palimpsest_core::config::PalimpsestConfig;
use palimpsest_core::error::{HistoryError, Result};

use crate::paths::PalimpsestPaths;
use crate::storage::AtomicTomlFile;

/// Reads and writes the engine configuration file.
pub struct ConfigService {
    file: AtomicTomlFile<PalimpsestConfig>,
}

impl ConfigService {
    /// Uses `~/.config/palimpsest/palimpsest.toml`.
    pub fn default_location() -> Result<Self> {
        let path = PalimpsestPaths::config_file()
            .map_err(|e| HistoryError::config(format!("Failed to get config path: {}", e)))?;
        Ok(Self::new(path))
    }

    pub fn new(path: PathBuf) -> Self {
        Self {
            file: AtomicTomlFile::new(path),
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Loads and validates the configuration.
    ///
    /// A missing or empty file yields the defaults.
    pub fn load(&self) -> Result<PalimpsestConfig> {
        let config = match self.file.load()? {
            Some(config) => config,
            None => {
                tracing::debug!(
                    "[Config] No config at {:?}, using defaults",
                    self.file.path()
                );
                PalimpsestConfig::default()
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, config: &PalimpsestConfig) -> Result<()> {
        config.validate()?;
        self.file.save(config)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::new(temp_dir.path().join("palimpsest.toml"));

        let config = service.load().unwrap();
        assert_eq!(config, PalimpsestConfig::default());
    }

    #[test]
    fn test_per_note_override_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("palimpsest.toml");
        std::fs::write(
            &path,
            r#"
[history]
retention_limit = 20

[history.per_note]
"note-a" = 3

[vault]
argon2_m_cost = 64
argon2_t_cost = 1
argon2_p_cost = 1
"#,
        )
        .unwrap();

        let config = ConfigService::new(path).load().unwrap();
        assert_eq!(config.history.limit_for("note-a"), 3);
        assert_eq!(config.history.limit_for("note-b"), 20);
        assert_eq!(config.vault.argon2_m_cost, 64);
    }

    #[test]
    fn test_zero_retention_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("palimpsest.toml");
        std::fs::write(&path, "[history]\nretention_limit = 0\n").unwrap();

        let err = ConfigService::new(path).load().unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_save_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::new(temp_dir.path().join("palimpsest.toml"));

        let mut config = PalimpsestConfig::default();
        config.history.retention_limit = 9;
        service.save(&config).unwrap();

        assert_eq!(service.load().unwrap().history.retention_limit, 9);
    }
}
