use thiserror::Error;
use url::Url;

use super::models::Config;

#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(
        &mut self,
        message: S,
        hint: H,
    ) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn extend(&mut self, other: ConfigWarnings) {
        self.items.extend(other.items);
    }
}

#[derive(Debug, Error)]
pub enum ConfigGuardRailError {
    #[error("app_url '{value}' is not an absolute URL")]
    InvalidAppUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },
    #[error("app_dir '{0}' must start with '/'")]
    RelativeAppDir(String),
    #[error(
        "settings file {} lies inside the publicly served storage root",
        .0.display()
    )]
    SettingsInsideStorage(std::path::PathBuf),
}

/// Rejects settings that would produce broken URLs or cookies and warns
/// about themes that will silently fall back to the default.
pub fn apply_guard_rails(
    config: &Config,
) -> Result<ConfigWarnings, ConfigGuardRailError> {
    let mut warnings = ConfigWarnings::default();
    let theme = &config.theme;

    if !theme.app_url.is_empty() {
        Url::parse(&theme.app_url).map_err(|source| {
            ConfigGuardRailError::InvalidAppUrl {
                value: theme.app_url.clone(),
                source,
            }
        })?;
    }

    if !theme.app_dir.starts_with('/') {
        return Err(ConfigGuardRailError::RelativeAppDir(theme.app_dir.clone()));
    }

    // the storage root is mounted at /files without access checks
    if let Some(settings) = config.storage.settings_path.as_ref()
        && settings.starts_with(&config.storage.root)
    {
        return Err(ConfigGuardRailError::SettingsInsideStorage(
            settings.clone(),
        ));
    }

    if !theme.themes_root.is_dir() {
        warnings.push_with_hint(
            format!(
                "themes root {} does not exist; every request will use the \
                 default theme",
                theme.themes_root.display()
            ),
            "Set THEMES_ROOT or [theme].themes_root to the theme directory",
        );
    } else if !theme.themes_root.join("default").join("theme.ini").is_file() {
        warnings.push("default theme is missing its theme.ini descriptor");
    }

    if let Some(default_theme) = theme.default_theme.as_deref()
        && !theme.themes_root.join(default_theme).join("theme.ini").is_file()
    {
        warnings.push(format!(
            "configured default theme '{default_theme}' is not installed"
        ));
    }

    if config.storage.signing_key.is_none() {
        warnings.push_with_hint(
            "no storage signing key configured; private file URLs are \
             signed with an empty key",
            "Set STORAGE_SIGNING_KEY",
        );
    }

    Ok(warnings)
}
