use std::{
    collections::BTreeMap,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::{io::AsyncWriteExt, sync::Mutex};
use tracing::debug;
use uuid::Uuid;

use crate::ports::UserSettingsStore;

/// Settings persisted as one JSON object on disk.
///
/// Writes go through a temp file and a rename so readers never observe a
/// partially written document.
#[derive(Debug)]
pub struct JsonFileSettingsStore {
    path: PathBuf,
    settings: Mutex<BTreeMap<String, String>>,
}

impl JsonFileSettingsStore {
    /// Loads `path`, starting empty when the file does not exist yet.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let settings = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).with_context(|| {
                format!("failed to parse settings file {}", path.display())
            })?,
            Err(err) if err.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to read settings file {}", path.display())
                });
            }
        };

        debug!(path = %path.display(), "opened settings file");
        Ok(Self {
            path,
            settings: Mutex::new(settings),
        })
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, settings: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.with_context(|| {
                format!("failed to create settings dir {}", parent.display())
            })?;
        }

        let bytes = serde_json::to_vec_pretty(settings)?;
        let tmp = self
            .path
            .with_extension(format!("tmp-{}", Uuid::new_v4().simple()));

        let mut file = tokio::fs::File::create(&tmp).await.with_context(|| {
            format!("failed to create temp settings file {}", tmp.display())
        })?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await.with_context(|| {
            format!(
                "failed to move settings file {} -> {}",
                tmp.display(),
                self.path.display()
            )
        })
    }
}

#[async_trait]
impl UserSettingsStore for JsonFileSettingsStore {
    async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        Ok(self.settings.lock().await.get(key).cloned())
    }

    async fn save_setting(&self, key: &str, value: &str) -> Result<()> {
        let mut settings = self.settings.lock().await;
        settings.insert(key.to_string(), value.to_string());
        self.persist(&settings).await
    }

    async fn delete_setting(&self, key: &str) -> Result<()> {
        let mut settings = self.settings.lock().await;
        if settings.remove(key).is_some() {
            self.persist(&settings).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn settings_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state/settings.json");

        let store = JsonFileSettingsStore::open(&path).await.unwrap();
        store
            .save_setting("usersettings.42.colorMode", "dark")
            .await
            .unwrap();
        store
            .save_setting("usersettings.42.themeFont", "atkinson")
            .await
            .unwrap();
        store.delete_setting("usersettings.42.themeFont").await.unwrap();

        let reopened = JsonFileSettingsStore::open(&path).await.unwrap();
        assert_eq!(
            reopened.get_setting("usersettings.42.colorMode").await.unwrap(),
            Some("dark".to_string())
        );
        assert_eq!(
            reopened.get_setting("usersettings.42.themeFont").await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn corrupt_file_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(JsonFileSettingsStore::open(&path).await.is_err());
    }
}
