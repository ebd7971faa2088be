//! Runtime configuration resolved from the command line.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;

const SETTINGS_FILE: &str = "settings.json";
const ACCOUNTS_FILE: &str = "accounts.json";

#[derive(Debug, Clone)]
pub struct AppConfig {
    data_dir: PathBuf,
    /// Keep settings in memory and accounts in a per-process temp dir.
    pub ephemeral: bool,
}

impl AppConfig {
    pub fn new(data_dir: impl Into<PathBuf>, ephemeral: bool) -> Self {
        let data_dir = if ephemeral {
            std::env::temp_dir().join(format!("safekey-{}", std::process::id()))
        } else {
            data_dir.into()
        };
        Self {
            data_dir,
            ephemeral,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Create the data directory if needed.
    /// Must be called once at startup before any file-backed store is opened.
    pub fn init_data_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        debug!("Data directory ready at {:?}", self.data_dir);
        Ok(())
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join(SETTINGS_FILE)
    }

    pub fn accounts_path(&self) -> PathBuf {
        self.data_dir.join(ACCOUNTS_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_live_under_data_dir() {
        let config = AppConfig::new("/tmp/safekey", false);
        assert_eq!(config.settings_path(), PathBuf::from("/tmp/safekey/settings.json"));
        assert_eq!(config.accounts_path(), PathBuf::from("/tmp/safekey/accounts.json"));
    }

    #[test]
    fn test_init_data_dir_creates_nested_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::new(dir.path().join("a/b"), false);
        config.init_data_dir().unwrap();
        assert!(config.data_dir().is_dir());
    }

    #[test]
    fn test_ephemeral_ignores_data_dir() {
        let config = AppConfig::new("/var/lib/safekey", true);
        assert!(config.data_dir().starts_with(std::env::temp_dir()));
    }
}
