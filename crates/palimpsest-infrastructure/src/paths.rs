//! Unified path management for palimpsest data files.
//!
//! Platform directories are resolved via AppPaths from the version-migrate
//! crate, the same resolver the storage layer uses.

use std::path::{Path, PathBuf};
use version_migrate::AppPaths;

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Home directory could not be determined.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

/// Directory layout of a palimpsest data root.
///
/// # Directory Structure
///
/// ```text
/// ~/.config/palimpsest/        # Config directory
/// └── palimpsest.toml          # Engine configuration
///
/// ~/.local/share/palimpsest/   # Data directory (or storage.data_dir)
/// ├── sessions.toml            # Session index
/// ├── vault.toml               # Vault verifier envelope
/// └── blobs/                   # One JSON file per content blob
/// ```
#[derive(Debug, Clone)]
pub struct PalimpsestPaths {
    data_dir: PathBuf,
}

impl PalimpsestPaths {
    const SESSION_INDEX_FILE: &'static str = "sessions.toml";
    const BLOB_DIR: &'static str = "blobs";
    const VAULT_KEY_FILE: &'static str = "vault.toml";
    const CONFIG_FILE: &'static str = "palimpsest.toml";

    /// Returns a configured AppPaths instance for palimpsest.
    fn app_paths() -> AppPaths {
        AppPaths::new("palimpsest")
    }

    /// Uses the platform data directory unless `data_dir` overrides it.
    pub fn resolve(data_dir: Option<&Path>) -> Result<Self, PathError> {
        let data_dir = match data_dir {
            Some(dir) => dir.to_path_buf(),
            None => Self::app_paths()
                .data_dir()
                .map_err(|_| PathError::HomeDirNotFound)?,
        };
        Ok(Self { data_dir })
    }

    /// Returns the default configuration file (`~/.config/palimpsest/palimpsest.toml`).
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::app_paths()
            .config_dir()
            .map_err(|_| PathError::HomeDirNotFound)?
            .join(Self::CONFIG_FILE))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn session_index(&self) -> PathBuf {
        self.data_dir.join(Self::SESSION_INDEX_FILE)
    }

    pub fn blob_dir(&self) -> PathBuf {
        self.data_dir.join(Self::BLOB_DIR)
    }

    /// Vault verifier file; absent until a vault is created.
    pub fn vault_key(&self) -> PathBuf {
        self.data_dir.join(Self::VAULT_KEY_FILE)
    }
}
