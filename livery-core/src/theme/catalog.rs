use std::{collections::BTreeMap, path::Path};

use tracing::{debug, warn};

use super::descriptor::{descriptor_path, read_descriptor};

/// `[general]` metadata of every installed theme, keyed by directory name.
pub type ThemeCatalog = BTreeMap<String, BTreeMap<String, String>>;

/// Scans `themes_root` for themes with a descriptor that declares a name.
///
/// Directories without a readable descriptor are skipped.
pub async fn list_themes(themes_root: &Path) -> ThemeCatalog {
    let mut themes = ThemeCatalog::new();

    let mut entries = match tokio::fs::read_dir(themes_root).await {
        Ok(entries) => entries,
        Err(err) => {
            warn!(
                root = %themes_root.display(),
                error = %err,
                "cannot read themes root"
            );
            return themes;
        }
    };

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(err) => {
                warn!(error = %err, "aborting theme scan");
                break;
            }
        };

        let is_dir = entry
            .file_type()
            .await
            .map(|file_type| file_type.is_dir())
            .unwrap_or(false);
        if !is_dir {
            continue;
        }

        let Ok(theme_id) = entry.file_name().into_string() else {
            continue;
        };

        match read_descriptor(&descriptor_path(themes_root, &theme_id)).await {
            Ok(file) if file.name().is_some() => {
                themes.insert(theme_id, file.general);
            }
            Ok(_) => {
                debug!(theme = %theme_id, "descriptor has no name, skipping")
            }
            Err(err) => {
                debug!(theme = %theme_id, error = %err, "skipping theme")
            }
        }
    }

    themes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lists_only_named_themes() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        std::fs::create_dir_all(root.join("default")).unwrap();
        std::fs::write(
            root.join("default/theme.ini"),
            "[general]\nname = Default\nversion = 1.0\n",
        )
        .unwrap();
        std::fs::create_dir_all(root.join("unnamed")).unwrap();
        std::fs::write(
            root.join("unnamed/theme.ini"),
            "[general]\nversion = 2\n",
        )
        .unwrap();
        std::fs::create_dir_all(root.join("bare")).unwrap();
        std::fs::write(root.join("stray.txt"), "not a theme").unwrap();

        let themes = list_themes(root).await;

        assert_eq!(themes.len(), 1);
        let general = &themes["default"];
        assert_eq!(general.get("name").map(String::as_str), Some("Default"));
        assert_eq!(general.get("version").map(String::as_str), Some("1.0"));
    }

    #[tokio::test]
    async fn missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_themes(&dir.path().join("nope")).await.is_empty());
    }
}
