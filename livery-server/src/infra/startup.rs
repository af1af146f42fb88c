use std::{sync::Arc, time::Duration};

use anyhow::Context;
use livery_core::{
    ThemeServices, UserSettingsStore,
    infra::{
        CatalogTranslator, JsonFileSettingsStore, LocalFileResolver,
        MemorySettingsStore,
    },
};
use tracing::{debug, info};

use crate::infra::{app_state::AppState, config::Config};

/// Wires the theme collaborators described by `config`.
pub async fn build_services(
    config: &Config,
) -> anyhow::Result<ThemeServices> {
    let storage = &config.storage;
    let settings: Arc<dyn UserSettingsStore> = match &storage.settings_path {
        Some(path) => {
            let store =
                JsonFileSettingsStore::open(path).await.with_context(|| {
                    format!("opening settings file {}", path.display())
                })?;
            info!(path = %path.display(), "persisting settings to file");
            Arc::new(store)
        }
        None => {
            info!("no settings path configured; settings are kept in memory");
            Arc::new(MemorySettingsStore::new())
        }
    };

    let mut files =
        LocalFileResolver::new(&storage.root, storage.base_url.clone());
    if let Some(key) = &storage.signing_key {
        files = files.with_signing_key(key.as_bytes().to_vec());
    }

    let translator = match &config.translations {
        Some(path) => CatalogTranslator::from_json_file(path)
            .await
            .with_context(|| {
                format!("loading translations {}", path.display())
            })?,
        None => CatalogTranslator::default(),
    };

    Ok(ThemeServices {
        config: Arc::new(config.theme.clone()),
        settings,
        files: Arc::new(files),
        translator: Arc::new(translator),
    })
}

pub async fn build_state(config: Config) -> anyhow::Result<AppState> {
    let services = build_services(&config).await?;
    Ok(AppState::new(config, services))
}

/// Periodically drops idle sessions for the lifetime of the process.
pub fn spawn_session_pruner(state: &AppState, every: Duration) {
    let sessions = state.sessions.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            let removed = sessions.prune();
            debug!(
                removed,
                remaining = sessions.len(),
                "session sweep finished"
            );
        }
    });
}
