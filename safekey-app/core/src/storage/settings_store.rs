//! Durable key-value persistence for app settings.
//!
//! The store is deliberately dumb: string keys, string values, no
//! interpretation. Parsing and invariants live in the session manager.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use super::write_atomic;
use crate::error::{Result, SafeKeyError};

/// The four persisted settings keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingsKey {
    Theme,
    AppLockEnabled,
    BiometricsEnabled,
    UserPin,
}

impl SettingsKey {
    #[cfg(test)]
    pub const ALL: [SettingsKey; 4] = [
        SettingsKey::Theme,
        SettingsKey::AppLockEnabled,
        SettingsKey::BiometricsEnabled,
        SettingsKey::UserPin,
    ];

    /// Storage name of the key.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Theme => "user-theme",
            Self::AppLockEnabled => "app-lock-enabled",
            Self::BiometricsEnabled => "biometrics-enabled",
            Self::UserPin => "user-pin",
        }
    }
}

impl fmt::Display for SettingsKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Asynchronous, fallible settings persistence.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Returns `None` if the key was never written (or was removed).
    async fn get(&self, key: SettingsKey) -> Result<Option<String>>;

    async fn set(&self, key: SettingsKey, value: &str) -> Result<()>;

    /// Removing an absent key is not an error.
    async fn remove(&self, key: SettingsKey) -> Result<()>;
}

/// Settings persisted as a flat JSON object in `settings.json`.
pub struct JsonFileSettingsStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles on the file.
    io: Mutex<()>,
}

impl JsonFileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            io: Mutex::new(()),
        }
    }

    async fn read_map(&self) -> Result<BTreeMap<String, String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                SafeKeyError::Storage(format!("Failed to parse settings file: {}", e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(SafeKeyError::Storage(format!(
                "Failed to read settings file: {}",
                e
            ))),
        }
    }

    async fn write_map(&self, map: &BTreeMap<String, String>) -> Result<()> {
        let content = serde_json::to_vec_pretty(map)?;
        write_atomic(&self.path, &content).await.map_err(|e| {
            SafeKeyError::Storage(format!("Failed to write settings file: {}", e))
        })
    }
}

#[async_trait]
impl SettingsStore for JsonFileSettingsStore {
    async fn get(&self, key: SettingsKey) -> Result<Option<String>> {
        let _guard = self.io.lock().await;
        let map = self.read_map().await?;
        Ok(map.get(key.as_str()).cloned())
    }

    async fn set(&self, key: SettingsKey, value: &str) -> Result<()> {
        let _guard = self.io.lock().await;
        let mut map = self.read_map().await?;
        map.insert(key.as_str().to_string(), value.to_string());
        self.write_map(&map).await?;
        debug!("Persisted setting {}", key);
        Ok(())
    }

    async fn remove(&self, key: SettingsKey) -> Result<()> {
        let _guard = self.io.lock().await;
        let mut map = self.read_map().await?;
        if map.remove(key.as_str()).is_some() {
            self.write_map(&map).await?;
            debug!("Removed setting {}", key);
        }
        Ok(())
    }
}
