use once_cell::sync::Lazy;
use std::{fs, path::PathBuf};
use thiserror::Error;

use livery_core::ThemeConfig;

use super::{
    models::{
        Config, ConfigMetadata, ServerConfig, SessionConfig, StorageConfig,
    },
    sources::{EnvConfig, FileConfig},
    validation::{self, ConfigGuardRailError, ConfigWarnings},
};

static DEFAULT_CONFIG_LOCATIONS: Lazy<Vec<PathBuf>> = Lazy::new(|| {
    vec![
        PathBuf::from("livery.toml"),
        PathBuf::from("config/livery.toml"),
    ]
});

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true).or_else(
                |err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                },
            )?,
            None => {
                dotenvy::dotenv().map(|_| true).or_else(|err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                })?
            }
        };

        self.load_with_env(EnvConfig::gather(), env_file_loaded)
    }

    /// Composes configuration from an explicit environment snapshot.
    pub fn load_with_env(
        &self,
        env_config: EnvConfig,
        env_file_loaded: bool,
    ) -> Result<ConfigLoad, ConfigLoadError> {
        let (file_config, config_path) = self.load_file_config(&env_config)?;
        let (config, warnings) = self.compose_config(
            file_config,
            env_config,
            config_path,
            env_file_loaded,
        )?;
        Ok(ConfigLoad { config, warnings })
    }

    fn load_file_config(
        &self,
        env_config: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let explicit = self
            .options
            .config_path
            .clone()
            .or_else(|| env_config.config_path.clone());

        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigLoadError::MissingConfig { path });
                }
                path
            }
            None => match DEFAULT_CONFIG_LOCATIONS
                .iter()
                .find(|candidate| candidate.exists())
            {
                Some(path) => path.clone(),
                None => return Ok((None, None)),
            },
        };

        let contents =
            fs::read_to_string(&path).map_err(|err| ConfigLoadError::Io {
                path: path.clone(),
                source: err,
            })?;
        let file_config: FileConfig =
            toml::from_str(&contents).map_err(|err| ConfigLoadError::Parse {
                path: path.clone(),
                source: err,
            })?;

        Ok((Some(file_config), Some(path)))
    }

    fn compose_config(
        &self,
        file_config: Option<FileConfig>,
        env: EnvConfig,
        config_path: Option<PathBuf>,
        env_file_loaded: bool,
    ) -> Result<(Config, ConfigWarnings), ConfigLoadError> {
        let mut warnings = ConfigWarnings::default();

        if file_config.is_none() {
            warnings.push_with_hint(
                "No livery.toml detected; using environment variables only",
                "Create livery.toml or pass --config",
            );
        }

        let FileConfig {
            server: file_server,
            theme: file_theme,
            storage: file_storage,
            sessions: file_sessions,
            translations: file_translations,
        } = file_config.unwrap_or_default();

        let server = ServerConfig {
            host: env
                .server_host
                .clone()
                .or(file_server.host)
                .unwrap_or_else(|| "0.0.0.0".to_string()),
            port: env.server_port.or(file_server.port).unwrap_or(3000),
        };

        let defaults = ThemeConfig::default();
        let theme = ThemeConfig {
            themes_root: env
                .themes_root
                .clone()
                .or(file_theme.themes_root)
                .unwrap_or(defaults.themes_root),
            app_url: env
                .app_url
                .clone()
                .or(file_theme.app_url)
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.app_url),
            app_dir: env
                .app_dir
                .clone()
                .or(file_theme.app_dir)
                .unwrap_or(defaults.app_dir),
            default_theme: env
                .default_theme
                .clone()
                .or(file_theme.default_theme),
            default_color_mode: env
                .default_color_mode
                .clone()
                .or(file_theme.default_color_mode),
            default_font: env.default_font.clone().or(file_theme.default_font),
            release_version: env
                .release_version
                .clone()
                .or(file_theme.release_version)
                .unwrap_or(defaults.release_version),
        };

        let storage = StorageConfig {
            root: env
                .storage_root
                .clone()
                .or(file_storage.root)
                .unwrap_or_else(|| PathBuf::from("./storage")),
            base_url: env
                .storage_base_url
                .clone()
                .or(file_storage.base_url)
                .unwrap_or_else(|| format!("{}/files", theme.app_url)),
            signing_key: env
                .storage_signing_key
                .clone()
                .or(file_storage.signing_key),
            settings_path: env
                .settings_path
                .clone()
                .or(file_storage.settings_path),
        };

        let sessions = match env
            .session_idle_timeout
            .clone()
            .or(file_sessions.idle_timeout)
        {
            Some(raw) => SessionConfig {
                idle_timeout: humantime::parse_duration(&raw).map_err(
                    |source| ConfigLoadError::InvalidDuration {
                        field: "sessions.idle_timeout",
                        value: raw.clone(),
                        source,
                    },
                )?,
            },
            None => SessionConfig::default(),
        };

        let mut config = Config {
            server,
            theme,
            storage,
            translations: env.translations.clone().or(file_translations),
            sessions,
            metadata: ConfigMetadata {
                config_path,
                env_file_loaded,
            },
        };

        config
            .ensure_directories()
            .map_err(|err| ConfigLoadError::Filesystem { source: err })?;
        config
            .normalize_paths()
            .map_err(|err| ConfigLoadError::Filesystem { source: err })?;

        let guard_warnings = validation::apply_guard_rails(&config)?;
        warnings.extend(guard_warnings);

        Ok((config, warnings))
    }
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("configuration file missing: {path}")]
    MissingConfig { path: PathBuf },
    #[error("failed to read configuration {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid duration '{value}' for {field}")]
    InvalidDuration {
        field: &'static str,
        value: String,
        #[source]
        source: humantime::DurationError,
    },
    #[error("filesystem initialization failed")]
    Filesystem { source: anyhow::Error },
    #[error(transparent)]
    GuardRail(#[from] ConfigGuardRailError),
    #[error(transparent)]
    EnvFile(#[from] dotenvy::Error),
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}
