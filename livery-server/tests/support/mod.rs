use std::{fs, path::Path, sync::Arc, time::Duration};

use anyhow::Result;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use livery_core::{
    SessionStore, ThemeConfig, ThemeServices, UserSettingsStore,
    infra::{CatalogTranslator, LocalFileResolver, MemorySettingsStore},
};
use livery_server::{
    AppState, create_app,
    infra::{
        config::{
            Config, ConfigMetadata, ServerConfig, SessionConfig,
            StorageConfig,
        },
        session::{SESSION_COOKIE, USER_ID_KEY},
    },
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

#[derive(Debug)]
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub settings: Arc<MemorySettingsStore>,
    _tempdir: TempDir,
}

fn write_theme(
    root: &Path,
    id: &str,
    name: &str,
    version: &str,
    files: &[&str],
) {
    let dir = root.join(id);
    fs::create_dir_all(dir.join("css")).unwrap();
    fs::create_dir_all(dir.join("js")).unwrap();
    fs::write(
        dir.join("theme.ini"),
        format!("[general]\nname = {name}\nversion = {version}\n"),
    )
    .unwrap();
    for file in files {
        fs::write(dir.join(file), "/* asset */").unwrap();
    }
}

pub fn build_test_app(default_theme: Option<&str>) -> Result<TestApp> {
    let tempdir = tempfile::tempdir()?;
    let themes_root = tempdir.path().join("theme");
    write_theme(
        &themes_root,
        "default",
        "Default",
        "3.0.0",
        &["css/light-leantime.min.css", "css/dark.css", "js/theme.js"],
    );
    write_theme(
        &themes_root,
        "dark",
        "Midnight",
        "1.2.0",
        &["css/dark.min.css"],
    );

    let storage_root = tempdir.path().join("storage");
    fs::create_dir_all(&storage_root)?;

    let mut theme = ThemeConfig::new(&themes_root)
        .with_app_url("http://localhost:3000")
        .with_app_dir("/")
        .with_release_version("9.9.9");
    theme.default_theme = default_theme.map(str::to_string);

    let config = Config {
        server: ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
        },
        theme: theme.clone(),
        storage: StorageConfig {
            root: storage_root.clone(),
            base_url: "http://localhost:3000/files".into(),
            signing_key: None,
            settings_path: None,
        },
        translations: None,
        sessions: SessionConfig {
            idle_timeout: Duration::from_secs(600),
        },
        metadata: ConfigMetadata::default(),
    };

    let settings = Arc::new(MemorySettingsStore::new());
    let settings_port: Arc<dyn UserSettingsStore> = settings.clone();
    let services = ThemeServices {
        config: Arc::new(theme),
        settings: settings_port,
        files: Arc::new(LocalFileResolver::new(
            storage_root,
            "http://localhost:3000/files",
        )),
        translator: Arc::new(CatalogTranslator::default()),
    };

    let state = AppState::new(config, services);
    Ok(TestApp {
        router: create_app(state.clone()),
        state,
        settings,
        _tempdir: tempdir,
    })
}

impl TestApp {
    /// Opens a session signed in as a fresh user and returns its cookie.
    pub fn sign_in(&self) -> (Uuid, String) {
        let user_id = Uuid::new_v4();
        let (session_id, session) = self.state.sessions.create();
        session.set(USER_ID_KEY, Value::String(user_id.to_string()));
        (user_id, format!("{SESSION_COOKIE}={session_id}"))
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn put_json(uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("PUT")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// `Set-Cookie` headers as `(name, full header)` pairs.
pub fn set_cookies(response: &Response<Body>) -> Vec<(String, String)> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| {
            let (name, _) = value.split_once('=')?;
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

pub fn cookie_value(response: &Response<Body>, name: &str) -> Option<String> {
    set_cookies(response)
        .into_iter()
        .find(|(cookie, _)| cookie == name)
        .and_then(|(_, header)| {
            header
                .split(';')
                .next()
                .and_then(|pair| pair.split_once('='))
                .map(|(_, value)| value.to_string())
        })
}
