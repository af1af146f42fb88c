use std::path::{Path, PathBuf};

use livery_core::ThemeConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub theme: ThemeConfig,
    pub storage: StorageConfig,
    pub translations: Option<PathBuf>,
    pub sessions: SessionConfig,
    pub metadata: ConfigMetadata,
}

impl Config {
    pub fn ensure_directories(&self) -> anyhow::Result<()> {
        self.storage.ensure_directories()
    }

    pub fn normalize_paths(&mut self) -> anyhow::Result<()> {
        self.storage.normalize_paths()
    }

    pub fn themes_root(&self) -> &Path {
        &self.theme.themes_root
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Uploaded files (company logos) and persisted settings.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub root: PathBuf,
    /// URL prefix the storage root is served under.
    pub base_url: String,
    pub signing_key: Option<String>,
    /// JSON settings file. Settings stay in memory when unset.
    pub settings_path: Option<PathBuf>,
}

impl StorageConfig {
    fn ensure_directories(&self) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.root)?;
        if let Some(parent) =
            self.settings_path.as_ref().and_then(|p| p.parent())
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    fn normalize_paths(&mut self) -> anyhow::Result<()> {
        self.root = std::fs::canonicalize(&self.root)?;
        if let Some(path) = self.settings_path.take() {
            let file_name = path.file_name().ok_or_else(|| {
                anyhow::anyhow!("no file name in {}", path.display())
            })?;
            let parent = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            self.settings_path =
                Some(std::fs::canonicalize(parent)?.join(file_name));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Sessions untouched for longer than this are dropped.
    pub idle_timeout: std::time::Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout: std::time::Duration::from_secs(60 * 60 * 24),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}
