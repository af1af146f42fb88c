use std::{
    fmt,
    path::{Path, PathBuf},
};

use serde::Serialize;
use tracing::debug;

use crate::config::ThemeConfig;

/// Kind of theme asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    /// Stylesheet below `css/`.
    Css,
    /// Script below `js/`.
    Js,
}

impl AssetKind {
    /// File extension, which is also the asset's subdirectory name.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Css => "css",
            Self::Js => "js",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// A theme asset that exists on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetReference {
    /// Theme the file belongs to.
    pub theme_id: String,
    /// Asset kind, which also picks the subdirectory.
    pub kind: AssetKind,
    /// File name without extension, e.g. a color mode.
    pub variant: String,
    /// Whether the `.min` variant was found.
    pub minified: bool,
}

impl AssetReference {
    /// File name including the `.min` infix and extension.
    pub fn file_name(&self) -> String {
        let ext = self.kind.extension();
        if self.minified {
            format!("{}.min.{ext}", self.variant)
        } else {
            format!("{}.{ext}", self.variant)
        }
    }

    /// Path relative to the themes root.
    pub fn relative_path(&self) -> PathBuf {
        Path::new(&self.theme_id)
            .join(self.kind.extension())
            .join(self.file_name())
    }
}

/// Filesystem-backed lookup of theme directories and asset files.
///
/// Every call stats the filesystem again; assets only change on deploy.
#[derive(Debug, Clone)]
pub struct ThemeAssets {
    themes_root: PathBuf,
    app_url: String,
    release_version: String,
}

impl ThemeAssets {
    /// Locator for `themes_root`, serving URLs below `app_url`.
    pub fn new(
        themes_root: impl Into<PathBuf>,
        app_url: impl Into<String>,
        release_version: impl Into<String>,
    ) -> Self {
        Self {
            themes_root: themes_root.into(),
            app_url: app_url.into().trim_end_matches('/').to_string(),
            release_version: release_version.into(),
        }
    }

    /// Locator built from the static theme configuration.
    pub fn from_config(config: &ThemeConfig) -> Self {
        Self::new(
            config.themes_root.clone(),
            config.app_url.clone(),
            config.release_version.clone(),
        )
    }

    /// Directory holding the installed themes.
    pub fn themes_root(&self) -> &Path {
        &self.themes_root
    }

    /// Directory of one theme.
    pub fn theme_dir(&self, theme_id: &str) -> PathBuf {
        self.themes_root.join(theme_id)
    }

    /// Public base URL of one theme.
    pub fn theme_url(&self, theme_id: &str) -> String {
        format!("{}/theme/{theme_id}", self.app_url)
    }

    /// Finds the minified variant first, then the plain one.
    pub async fn locate(
        &self,
        theme_id: &str,
        file_name: &str,
        kind: AssetKind,
    ) -> Option<AssetReference> {
        if file_name.is_empty() {
            return None;
        }

        for minified in [true, false] {
            let reference = AssetReference {
                theme_id: theme_id.to_string(),
                kind,
                variant: file_name.to_string(),
                minified,
            };
            let path = self.themes_root.join(reference.relative_path());
            if is_file(&path).await {
                return Some(reference);
            }
        }

        debug!(
            theme = theme_id,
            file = file_name,
            %kind,
            "theme asset not found"
        );
        None
    }

    /// Versioned public URL of a located asset.
    pub fn url_for(&self, reference: &AssetReference) -> String {
        format!(
            "{}/{}/{}?v={}",
            self.theme_url(&reference.theme_id),
            reference.kind.extension(),
            reference.file_name(),
            self.release_version
        )
    }

    /// Locates an asset and returns its versioned URL.
    pub async fn asset_url(
        &self,
        theme_id: &str,
        file_name: &str,
        kind: AssetKind,
    ) -> Option<String> {
        self.locate(theme_id, file_name, kind)
            .await
            .map(|reference| self.url_for(&reference))
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}
