use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as defined in a TOML file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FileConfig {
    #[serde(default)]
    pub server: FileServerConfig,
    #[serde(default)]
    pub theme: FileThemeConfig,
    #[serde(default)]
    pub storage: FileStorageConfig,
    #[serde(default)]
    pub sessions: FileSessionConfig,
    pub translations: Option<PathBuf>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileServerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileThemeConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub themes_root: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_theme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_color_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_font: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_version: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileStorageConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signing_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings_path: Option<PathBuf>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileSessionConfig {
    /// Human readable duration, e.g. `12h`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_timeout: Option<String>,
}

/// Environment-derived configuration values.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub server_host: Option<String>,
    pub server_port: Option<u16>,
    pub themes_root: Option<PathBuf>,
    pub app_url: Option<String>,
    pub app_dir: Option<String>,
    pub default_theme: Option<String>,
    pub default_color_mode: Option<String>,
    pub default_font: Option<String>,
    pub release_version: Option<String>,
    pub storage_root: Option<PathBuf>,
    pub storage_base_url: Option<String>,
    pub storage_signing_key: Option<String>,
    pub settings_path: Option<PathBuf>,
    pub translations: Option<PathBuf>,
    pub session_idle_timeout: Option<String>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        Self {
            config_path: env_path("LIVERY_CONFIG"),
            server_host: env_string("SERVER_HOST"),
            server_port: std::env::var("SERVER_PORT")
                .ok()
                .and_then(|s| s.parse().ok()),
            themes_root: env_path("THEMES_ROOT"),
            app_url: env_string("APP_URL"),
            app_dir: env_string("APP_DIR"),
            default_theme: env_string("DEFAULT_THEME"),
            default_color_mode: env_string("DEFAULT_COLOR_MODE"),
            default_font: env_string("DEFAULT_FONT"),
            release_version: env_string("RELEASE_VERSION"),
            storage_root: env_path("STORAGE_ROOT"),
            storage_base_url: env_string("STORAGE_BASE_URL"),
            storage_signing_key: env_string("STORAGE_SIGNING_KEY"),
            settings_path: env_path("SETTINGS_PATH"),
            translations: env_path("TRANSLATIONS_PATH"),
            session_idle_timeout: env_string("SESSION_IDLE_TIMEOUT"),
        }
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn env_path(name: &str) -> Option<PathBuf> {
    env_string(name).map(PathBuf::from)
}
