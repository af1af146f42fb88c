use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::preference::PreferenceKey;

/// Static inputs to theme resolution.
///
/// Built once at startup and shared by every request's resolver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeConfig {
    /// Directory holding one subdirectory per theme.
    pub themes_root: PathBuf,
    /// Public base URL of the application, without a trailing slash.
    pub app_url: String,
    /// Base path the application is mounted under. Cookies are scoped to it.
    pub app_dir: String,
    /// Deployment-wide theme used when no user, session or cookie value exists.
    pub default_theme: Option<String>,
    /// Deployment-wide color mode.
    pub default_color_mode: Option<String>,
    /// Deployment-wide font.
    pub default_font: Option<String>,
    /// Appended to every asset URL as `?v=` for cache busting.
    pub release_version: String,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            themes_root: PathBuf::from("./theme"),
            app_url: String::new(),
            app_dir: "/".to_string(),
            default_theme: None,
            default_color_mode: None,
            default_font: None,
            release_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ThemeConfig {
    /// Configuration with defaults for everything but the themes root.
    pub fn new(themes_root: impl Into<PathBuf>) -> Self {
        Self {
            themes_root: themes_root.into(),
            ..Default::default()
        }
    }

    /// Sets the public base URL, dropping trailing slashes.
    pub fn with_app_url(mut self, app_url: impl Into<String>) -> Self {
        self.app_url = app_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the mount path.
    pub fn with_app_dir(mut self, app_dir: impl Into<String>) -> Self {
        self.app_dir = app_dir.into();
        self
    }

    /// Sets the deployment-wide theme.
    pub fn with_default_theme(mut self, theme: impl Into<String>) -> Self {
        self.default_theme = Some(theme.into());
        self
    }

    /// Sets the cache-busting version.
    pub fn with_release_version(mut self, version: impl Into<String>) -> Self {
        self.release_version = version.into();
        self
    }

    /// Configured default for a chained key, ignoring blank values.
    pub fn configured_default(&self, key: PreferenceKey) -> Option<&str> {
        let value = match key {
            PreferenceKey::Theme => self.default_theme.as_deref(),
            PreferenceKey::ColorMode => self.default_color_mode.as_deref(),
            PreferenceKey::Font => self.default_font.as_deref(),
            _ => None,
        };
        value.filter(|value| !value.trim().is_empty())
    }

    /// Cookie path: the base path with exactly one trailing slash.
    pub fn cookie_path(&self) -> String {
        if self.app_dir.ends_with('/') {
            self.app_dir.clone()
        } else {
            format!("{}/", self.app_dir)
        }
    }
}
