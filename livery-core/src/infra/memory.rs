use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;

use crate::ports::{SessionStore, UserSettingsStore};

/// Session data held in process memory.
#[derive(Debug, Default)]
pub struct MemorySession {
    values: Mutex<HashMap<String, Value>>,
}

impl MemorySession {
    /// Empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every stored value.
    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.values.lock().clone()
    }
}

impl SessionStore for MemorySession {
    fn exists(&self, key: &str) -> bool {
        self.values.lock().contains_key(key)
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.values.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) {
        self.values.lock().insert(key.to_string(), value);
    }

    fn forget(&self, key: &str) {
        self.values.lock().remove(key);
    }
}

/// Settings store for tests and single-node development setups.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    settings: DashMap<String, String>,
}

impl MemorySettingsStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds one setting.
    pub fn with_setting(
        self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    /// Number of stored settings.
    pub fn len(&self) -> usize {
        self.settings.len()
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }
}

#[async_trait]
impl UserSettingsStore for MemorySettingsStore {
    async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        Ok(self.settings.get(key).map(|entry| entry.value().clone()))
    }

    async fn save_setting(&self, key: &str, value: &str) -> Result<()> {
        self.settings.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete_setting(&self, key: &str) -> Result<()> {
        self.settings.remove(key);
        Ok(())
    }
}
