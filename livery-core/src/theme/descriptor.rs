use std::{
    collections::BTreeMap,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use config::{Config, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ThemeError};

/// File name of the per-theme descriptor.
pub const DESCRIPTOR_FILE: &str = "theme.ini";

/// Raw `theme.ini` content. Only the `[general]` section is interpreted.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct DescriptorFile {
    #[serde(default)]
    /// Keys of the `[general]` section.
    pub general: BTreeMap<String, String>,
}

impl DescriptorFile {
    /// Display name, ignoring blank values.
    pub fn name(&self) -> Option<&str> {
        self.general
            .get("name")
            .map(String::as_str)
            .filter(|name| !name.trim().is_empty())
    }

    /// Declared theme version.
    pub fn version(&self) -> Option<&str> {
        self.general.get("version").map(String::as_str)
    }
}

/// Metadata of one installed theme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThemeDescriptor {
    /// Theme id, the directory name.
    pub id: String,
    /// Name declared in the descriptor.
    pub display_name: Option<String>,
    /// Declared version, empty when absent.
    pub version: String,
}

impl ThemeDescriptor {
    /// Extracts the metadata of theme `id`.
    pub fn from_file(id: impl Into<String>, file: &DescriptorFile) -> Self {
        Self {
            id: id.into(),
            display_name: file.name().map(str::to_string),
            version: file.version().unwrap_or_default().to_string(),
        }
    }
}

/// Location of a theme's `theme.ini`.
pub fn descriptor_path(themes_root: &Path, theme_id: &str) -> PathBuf {
    themes_root.join(theme_id).join(DESCRIPTOR_FILE)
}

/// Parses INI text; `path` is only used in errors.
pub fn parse_descriptor(path: &Path, contents: &str) -> Result<DescriptorFile> {
    Config::builder()
        .add_source(File::from_str(contents, FileFormat::Ini))
        .build()
        .and_then(Config::try_deserialize)
        .map_err(|source| ThemeError::Descriptor {
            path: path.to_path_buf(),
            source,
        })
}

/// Reads and parses a descriptor file.
pub async fn read_descriptor(path: &Path) -> Result<DescriptorFile> {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(ThemeError::DescriptorMissing(path.to_path_buf()));
        }
        Err(err) => return Err(err.into()),
    };
    parse_descriptor(path, &contents)
}

/// Loads the descriptor of an installed theme.
pub async fn load_descriptor(
    themes_root: &Path,
    theme_id: &str,
) -> Result<ThemeDescriptor> {
    let file = read_descriptor(&descriptor_path(themes_root, theme_id)).await?;
    Ok(ThemeDescriptor::from_file(theme_id, &file))
}
