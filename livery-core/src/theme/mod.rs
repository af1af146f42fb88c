/// Asset lookup with minified-first fallback
pub mod assets;
/// Installed theme enumeration
pub mod catalog;
/// `theme.ini` parsing
pub mod descriptor;

use std::path::Path;

pub use assets::{AssetKind, AssetReference, ThemeAssets};
pub use catalog::{ThemeCatalog, list_themes};
pub use descriptor::{DESCRIPTOR_FILE, DescriptorFile, ThemeDescriptor};

/// Style file for user customizations (without extension).
pub const CUSTOM_CSS: &str = "custom";
/// Script file for user customizations (without extension).
pub const CUSTOM_JS: &str = "custom";
/// Main theme script (without extension).
pub const THEME_JS: &str = "theme";
/// Logo shown when the company has not uploaded one.
pub const DEFAULT_LOGO: &str = "/dist/images/logo.svg";

/// A theme is installed when its directory and descriptor both exist.
pub async fn theme_exists(themes_root: &Path, theme_id: &str) -> bool {
    let dir = themes_root.join(theme_id);
    let dir_ok = tokio::fs::metadata(&dir)
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false);

    dir_ok
        && tokio::fs::try_exists(dir.join(DESCRIPTOR_FILE))
            .await
            .unwrap_or(false)
}
