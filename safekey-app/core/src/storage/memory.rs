use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::settings_store::{SettingsKey, SettingsStore};
use crate::error::Result;

/// Settings kept in process memory only.
#[derive(Default)]
pub struct MemorySettingsStore {
    map: Mutex<HashMap<SettingsKey, String>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate values, as if written by a previous run.
    pub fn with_values<'a>(values: impl IntoIterator<Item = (SettingsKey, &'a str)>) -> Self {
        let map = values
            .into_iter()
            .map(|(k, v)| (k, v.to_string()))
            .collect();
        Self {
            map: Mutex::new(map),
        }
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn get(&self, key: SettingsKey) -> Result<Option<String>> {
        Ok(self.map.lock().await.get(&key).cloned())
    }

    async fn set(&self, key: SettingsKey, value: &str) -> Result<()> {
        self.map.lock().await.insert(key, value.to_string());
        Ok(())
    }

    async fn remove(&self, key: SettingsKey) -> Result<()> {
        self.map.lock().await.remove(&key);
        Ok(())
    }
}
