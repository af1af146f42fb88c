use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading themes or writing preferences.
///
/// Read paths of the resolver log these and fall back to defaults; only
/// explicit writes surface them to callers.
#[derive(Error, Debug)]
pub enum ThemeError {
    /// Filesystem access below the themes root failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A `theme.ini` exists but could not be parsed.
    #[error("failed to read theme descriptor {path}")]
    Descriptor {
        /// Descriptor file that failed to parse.
        path: PathBuf,
        /// Parser error.
        #[source]
        source: config::ConfigError,
    },

    /// The theme directory has no `theme.ini`.
    #[error("theme descriptor missing: {0}")]
    DescriptorMissing(PathBuf),

    /// The user settings store rejected a read or write.
    #[error("user settings store failed: {0}")]
    Settings(#[source] anyhow::Error),

    /// A value failed validation for the named preference.
    #[error("Invalid value for {key}: {value}")]
    InvalidValue {
        /// Setting name of the preference.
        key: &'static str,
        /// Rejected input.
        value: String,
    },
}

/// Result alias used throughout `livery-core`.
pub type Result<T> = std::result::Result<T, ThemeError>;
