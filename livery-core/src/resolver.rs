//! Per-request resolution of theme preferences.
//!
//! Theme id, color mode and font are looked up through the same chain:
//!
//! 1. session (authenticated callers only)
//! 2. persisted user setting (authenticated callers only)
//! 3. incoming cookie
//! 4. configured default
//! 5. hard default
//!
//! Values found in tiers 2 to 4 are promoted: written to the session when
//! the caller is authenticated and queued as a cookie for the response.
//! Nothing in here returns an error for a read; every failure degrades to a
//! default so page rendering never breaks.

use std::{fmt, path::PathBuf, sync::Arc};

use chrono::Duration;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    config::ThemeConfig,
    cookies::OutgoingCookie,
    error::{Result, ThemeError},
    ports::{
        CookieJar, FileResolver, Identity, SessionStore, Translator,
        UserSettingsStore, Visibility,
    },
    preference::{
        BackgroundType, DEFAULT_THEME, FONTS, FontChoice, PreferenceKey,
        ResolvedPreference, Tier,
    },
    theme::{
        self, AssetKind, CUSTOM_CSS, CUSTOM_JS, DEFAULT_LOGO, THEME_JS,
        ThemeAssets, ThemeCatalog, ThemeDescriptor,
        descriptor::load_descriptor,
    },
};

/// Validity window of uploaded logo URLs.
const LOGO_URL_TTL_HOURS: i64 = 24;

/// Session keys dropped by [`PreferenceResolver::clear_cache`].
const CACHED_SESSION_KEYS: &[&str] = &[
    "usersettings.colorMode",
    "usersettings.colorScheme",
    "usersettings.themeFont",
    "usersettings.theme",
];

/// Application-wide collaborators shared by every request's resolver.
#[derive(Clone)]
pub struct ThemeServices {
    /// Static theme configuration.
    pub config: Arc<ThemeConfig>,
    /// Persistent user and company settings.
    pub settings: Arc<dyn UserSettingsStore>,
    /// Turns stored file references into public URLs.
    pub files: Arc<dyn FileResolver>,
    /// Fallback names for themes without a descriptor.
    pub translator: Arc<dyn Translator>,
}

impl fmt::Debug for ThemeServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThemeServices")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Resolves preferences for one request.
///
/// Holds the request's session and cookie handles; build a new one per
/// request. The descriptor cache lives and dies with the instance.
pub struct PreferenceResolver {
    identity: Identity,
    session: Arc<dyn SessionStore>,
    cookies: Arc<dyn CookieJar>,
    services: ThemeServices,
    assets: ThemeAssets,
    descriptor: Mutex<Option<ThemeDescriptor>>,
}

impl fmt::Debug for PreferenceResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreferenceResolver")
            .field("identity", &self.identity)
            .field("descriptor", &*self.descriptor.lock())
            .finish_non_exhaustive()
    }
}

impl PreferenceResolver {
    /// Binds the shared services to one request's caller, session and
    /// cookie jar.
    pub fn new(
        services: ThemeServices,
        identity: Identity,
        session: Arc<dyn SessionStore>,
        cookies: Arc<dyn CookieJar>,
    ) -> Self {
        let assets = ThemeAssets::from_config(&services.config);
        Self {
            identity,
            session,
            cookies,
            services,
            assets,
            descriptor: Mutex::new(None),
        }
    }

    /// Caller the resolver acts for.
    pub fn identity(&self) -> Identity {
        self.identity
    }

    /// Static theme configuration.
    pub fn config(&self) -> &ThemeConfig {
        &self.services.config
    }

    /// Asset locator for the configured themes root.
    pub fn assets(&self) -> &ThemeAssets {
        &self.assets
    }

    /// Looks up `key` and reports which tier answered.
    ///
    /// Returns `None` only for keys without a hard default (background
    /// image, company logo) when nothing is stored.
    pub async fn resolve(
        &self,
        key: PreferenceKey,
    ) -> Option<ResolvedPreference> {
        match key {
            key if key.is_chained() => Some(self.resolve_chained(key).await),
            PreferenceKey::BackgroundType => {
                let resolved = match self.persisted(key).await {
                    Some(value) => match value.parse::<BackgroundType>() {
                        Ok(kind) => ResolvedPreference::new(
                            key,
                            kind.as_str(),
                            Tier::PersistedUserSetting,
                        ),
                        Err(err) => {
                            debug!(
                                error = %err,
                                "ignoring stored background type"
                            );
                            Self::hard_default(key)
                        }
                    },
                    None => Self::hard_default(key),
                };
                Some(resolved)
            }
            PreferenceKey::BackgroundImage => self
                .persisted(key)
                .await
                .filter(|value| !value.is_empty())
                .map(|value| {
                    ResolvedPreference::new(
                        key,
                        value,
                        Tier::PersistedUserSetting,
                    )
                }),
            // company logo
            _ => self.resolve_logo().await,
        }
    }

    async fn resolve_chained(&self, key: PreferenceKey) -> ResolvedPreference {
        if self.identity.is_authenticated() {
            if let Some(value) = self.session_string(key) {
                return ResolvedPreference::new(key, value, Tier::Session);
            }

            if let Some(value) = self.persisted(key).await {
                let value = self.apply(key, &value).await;
                return ResolvedPreference::new(
                    key,
                    value,
                    Tier::PersistedUserSetting,
                );
            }
        }

        let cookie = key
            .cookie_name()
            .and_then(|name| self.cookies.incoming(name));
        if let Some(value) = cookie {
            let value = self.apply(key, &value).await;
            return ResolvedPreference::new(key, value, Tier::Cookie);
        }

        if let Some(value) = self.services.config.configured_default(key) {
            let value = self.apply(key, value).await;
            return ResolvedPreference::new(key, value, Tier::ConfigDefault);
        }

        Self::hard_default(key)
    }

    fn hard_default(key: PreferenceKey) -> ResolvedPreference {
        ResolvedPreference::new(
            key,
            key.hard_default().unwrap_or_default(),
            Tier::HardDefault,
        )
    }

    async fn apply(&self, key: PreferenceKey, value: &str) -> String {
        match key {
            PreferenceKey::Theme => self.set_active(value).await,
            PreferenceKey::ColorMode => self.set_color_mode(value),
            PreferenceKey::Font => self.set_font(value),
            _ => value.to_string(),
        }
    }

    fn session_string(&self, key: PreferenceKey) -> Option<String> {
        let session_key = key.session_key()?;
        if !self.session.exists(session_key) {
            return None;
        }
        match self.session.get(session_key)? {
            Value::String(value) => Some(value),
            other => {
                debug!(
                    key = session_key,
                    value = %other,
                    "ignoring non-string session value"
                );
                None
            }
        }
    }

    /// Reads the caller's persisted setting. Store failures count as absent.
    async fn persisted(&self, key: PreferenceKey) -> Option<String> {
        let scoped = key.scoped_setting(self.identity.user_id())?;
        match self.services.settings.get_setting(&scoped).await {
            Ok(value) => value,
            Err(err) => {
                warn!(
                    key = %scoped,
                    error = %err,
                    "failed to read user setting"
                );
                None
            }
        }
    }

    /// Session write for authenticated callers, deferred cookie for everyone.
    fn store_preference(&self, key: PreferenceKey, value: &str) {
        if self.identity.is_authenticated()
            && let Some(session_key) = key.session_key()
        {
            self.session
                .set(session_key, Value::String(value.to_string()));
        }

        if let Some(name) = key.cookie_name() {
            self.cookies.queue(OutgoingCookie::preference(
                name,
                value,
                self.services.config.cookie_path(),
            ));
        }
    }

    /// Active theme id.
    pub async fn active(&self) -> String {
        self.resolve_chained(PreferenceKey::Theme).await.value
    }

    /// Active color mode.
    pub async fn color_mode(&self) -> String {
        self.resolve_chained(PreferenceKey::ColorMode).await.value
    }

    /// Active font key.
    pub async fn font(&self) -> String {
        self.resolve_chained(PreferenceKey::Font).await.value
    }

    /// Selects a theme and returns the id actually stored.
    ///
    /// Empty, malformed or uninstalled ids are replaced by the default theme.
    pub async fn set_active(&self, id: &str) -> String {
        let mut id = if id.is_empty() { DEFAULT_THEME } else { id };

        if !PreferenceKey::Theme.accepts(id)
            || !theme::theme_exists(self.assets.themes_root(), id).await
        {
            debug!(requested = id, "theme not installed, using default");
            id = DEFAULT_THEME;
        }

        {
            let mut cached = self.descriptor.lock();
            if cached.as_ref().is_some_and(|descriptor| descriptor.id != id) {
                *cached = None;
            }
        }

        self.store_preference(PreferenceKey::Theme, id);
        id.to_string()
    }

    /// Selects a color mode and returns the value actually stored.
    pub fn set_color_mode(&self, color_mode: &str) -> String {
        self.set_token(PreferenceKey::ColorMode, color_mode)
    }

    /// Selects a font and returns the value actually stored.
    pub fn set_font(&self, font: &str) -> String {
        self.set_token(PreferenceKey::Font, font)
    }

    /// Empty or malformed values are replaced by the hard default.
    fn set_token(&self, key: PreferenceKey, value: &str) -> String {
        let value = if key.accepts(value) {
            value
        } else {
            if !value.is_empty() {
                debug!(%key, "rejecting malformed preference value");
            }
            key.hard_default().unwrap_or_default()
        };
        self.store_preference(key, value);
        value.to_string()
    }

    /// Persists a chained preference for the authenticated caller.
    pub async fn save_user_setting(
        &self,
        key: PreferenceKey,
        value: &str,
    ) -> Result<()> {
        let Some(scoped) = key.scoped_setting(self.identity.user_id()) else {
            debug!(%key, "not persisting preference for anonymous caller");
            return Ok(());
        };
        self.services
            .settings
            .save_setting(&scoped, value)
            .await
            .map_err(ThemeError::Settings)
    }

    /// Stored background type, `gradient` when unset or unreadable.
    pub async fn background_type(&self) -> BackgroundType {
        self.resolve(PreferenceKey::BackgroundType)
            .await
            .and_then(|resolved| resolved.value.parse().ok())
            .unwrap_or_default()
    }

    /// Stored background image URL.
    pub async fn background_image(&self) -> Option<String> {
        self.resolve(PreferenceKey::BackgroundImage)
            .await
            .map(|resolved| resolved.value)
    }

    /// Stores the background type. Switching to a gradient drops any stored
    /// image. No-op for anonymous callers.
    pub async fn set_background_type(
        &self,
        background: BackgroundType,
    ) -> Result<()> {
        let Some(user_id) = self.identity.user_id() else {
            return Ok(());
        };
        let settings = &self.services.settings;

        if let Some(key) =
            PreferenceKey::BackgroundType.scoped_setting(Some(user_id))
        {
            settings
                .save_setting(&key, background.as_str())
                .await
                .map_err(ThemeError::Settings)?;
        }

        if background == BackgroundType::Gradient
            && let Some(key) =
                PreferenceKey::BackgroundImage.scoped_setting(Some(user_id))
        {
            settings
                .delete_setting(&key)
                .await
                .map_err(ThemeError::Settings)?;
        }

        Ok(())
    }

    /// Stores an image background, switching the type to `image`.
    pub async fn set_background_image(&self, url: &str) -> Result<()> {
        let Some(user_id) = self.identity.user_id() else {
            return Ok(());
        };
        if !PreferenceKey::BackgroundImage.accepts(url) {
            return Err(ThemeError::InvalidValue {
                key: "backgroundImage",
                value: url.to_string(),
            });
        }
        let settings = &self.services.settings;

        for (key, value) in [
            (PreferenceKey::BackgroundType, BackgroundType::Image.as_str()),
            (PreferenceKey::BackgroundImage, url),
        ] {
            if let Some(scoped) = key.scoped_setting(Some(user_id)) {
                settings
                    .save_setting(&scoped, value)
                    .await
                    .map_err(ThemeError::Settings)?;
            }
        }

        Ok(())
    }

    /// Company logo URL, if one is configured and reachable.
    pub async fn logo_url(&self) -> Option<String> {
        self.resolve_logo().await.map(|resolved| resolved.value)
    }

    /// Bundled logo shipped with the application.
    pub fn default_logo_url(&self) -> String {
        format!("{}{DEFAULT_LOGO}", self.services.config.app_url)
    }

    /// Logo lookups are cached in the session, misses included, so storage
    /// is queried at most once per session.
    async fn resolve_logo(&self) -> Option<ResolvedPreference> {
        let key = PreferenceKey::CompanyLogo;
        let session_key = key.session_key()?;

        if self.session.exists(session_key) {
            return match self.session.get(session_key) {
                Some(Value::String(url)) if !url.is_empty() => {
                    Some(ResolvedPreference::new(key, url, Tier::Session))
                }
                _ => None,
            };
        }

        let stored = self.persisted(key).await.filter(|path| !path.is_empty());
        let Some(stored) = stored else {
            self.session.set(session_key, Value::Bool(false));
            return None;
        };

        if stored.starts_with("http") {
            self.session.set(session_key, Value::String(stored.clone()));
            return Some(ResolvedPreference::new(
                key,
                stored,
                Tier::PersistedUserSetting,
            ));
        }

        let resolved = self
            .services
            .files
            .resolve_url(
                &stored,
                Visibility::Public,
                Duration::hours(LOGO_URL_TTL_HOURS),
            )
            .await
            .unwrap_or_else(|err| {
                warn!(
                    reference = %stored,
                    error = %err,
                    "failed to resolve logo file"
                );
                None
            });

        match resolved {
            Some(url) => {
                self.session.set(session_key, Value::String(url.clone()));
                Some(ResolvedPreference::new(
                    key,
                    url,
                    Tier::PersistedUserSetting,
                ))
            }
            None => {
                debug!(
                    reference = %stored,
                    "company logo not found, caching miss"
                );
                self.session.set(session_key, Value::Bool(false));
                None
            }
        }
    }

    /// Forgets every theme value cached in the session.
    pub fn clear_cache(&self) {
        for key in CACHED_SESSION_KEYS {
            self.session.forget(key);
        }
        *self.descriptor.lock() = None;
    }

    async fn descriptor_for(&self, theme_id: &str) -> Option<ThemeDescriptor> {
        let cached = self
            .descriptor
            .lock()
            .clone()
            .filter(|descriptor| descriptor.id == theme_id);
        if cached.is_some() {
            return cached;
        }

        match load_descriptor(self.assets.themes_root(), theme_id).await {
            Ok(descriptor) => {
                *self.descriptor.lock() = Some(descriptor.clone());
                Some(descriptor)
            }
            Err(err) => {
                warn!(
                    theme = theme_id,
                    error = %err,
                    "failed to load theme descriptor"
                );
                None
            }
        }
    }

    /// Display name of the active theme, falling back to its translation key.
    pub async fn name(&self) -> String {
        let active = self.active().await;
        self.name_of(&active).await
    }

    /// Display name of an installed theme without resolving the active one.
    pub async fn name_of(&self, theme_id: &str) -> String {
        match self
            .descriptor_for(theme_id)
            .await
            .and_then(|descriptor| descriptor.display_name)
        {
            Some(name) => name,
            None => self
                .services
                .translator
                .translate(&format!("theme.{theme_id}name")),
        }
    }

    /// Version of the active theme, empty when the descriptor has none.
    pub async fn version(&self) -> String {
        let active = self.active().await;
        self.version_of(&active).await
    }

    /// Version of an installed theme.
    pub async fn version_of(&self, theme_id: &str) -> String {
        self.descriptor_for(theme_id)
            .await
            .map(|descriptor| descriptor.version)
            .unwrap_or_default()
    }

    /// Every installed theme keyed by id.
    pub async fn list_all(&self) -> ThemeCatalog {
        theme::list_themes(self.assets.themes_root()).await
    }

    /// Fonts offered in the theme settings.
    pub fn available_fonts(&self) -> &'static [FontChoice] {
        FONTS
    }

    /// Directory of the active theme.
    pub async fn dir(&self) -> PathBuf {
        self.assets.theme_dir(&self.active().await)
    }

    /// Directory of the default theme.
    pub fn default_dir(&self) -> PathBuf {
        self.assets.theme_dir(DEFAULT_THEME)
    }

    /// Public base URL of the active theme.
    pub async fn url(&self) -> String {
        self.assets.theme_url(&self.active().await)
    }

    /// Public base URL of the default theme.
    pub fn default_url(&self) -> String {
        self.assets.theme_url(DEFAULT_THEME)
    }

    /// Versioned URL of an asset in the active theme, with default theme
    /// fallback.
    pub async fn asset_url(
        &self,
        file_name: &str,
        kind: AssetKind,
    ) -> Option<String> {
        let active = self.active().await;
        self.assets.asset_url(&active, file_name, kind).await
    }

    /// Stylesheet named after the active color mode.
    pub async fn style_url(&self) -> Option<String> {
        let color_mode = self.color_mode().await;
        self.asset_url(&color_mode, AssetKind::Css).await
    }

    /// Site-specific stylesheet overrides.
    pub async fn custom_style_url(&self) -> Option<String> {
        self.asset_url(CUSTOM_CSS, AssetKind::Css).await
    }

    /// Theme script.
    pub async fn js_url(&self) -> Option<String> {
        self.asset_url(THEME_JS, AssetKind::Js).await
    }

    /// Site-specific script overrides.
    pub async fn custom_js_url(&self) -> Option<String> {
        self.asset_url(CUSTOM_JS, AssetKind::Js).await
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, path::Path};

    use mockall::predicate::eq;
    use serde_json::json;
    use tempfile::TempDir;
    use uuid::Uuid;

    use super::*;
    use crate::{
        cookies::RequestCookies,
        infra::{CatalogTranslator, MemorySession, MemorySettingsStore},
        ports::{MockFileResolver, MockUserSettingsStore},
    };

    struct Fixture {
        _themes: TempDir,
        config: ThemeConfig,
        session: Arc<MemorySession>,
        cookies: Arc<RequestCookies>,
    }

    fn install_theme(root: &Path, id: &str, ini: &str) {
        std::fs::create_dir_all(root.join(id).join("css")).unwrap();
        std::fs::create_dir_all(root.join(id).join("js")).unwrap();
        std::fs::write(root.join(id).join("theme.ini"), ini).unwrap();
    }

    fn fixture_with_cookies(incoming: &[(&str, &str)]) -> Fixture {
        let themes = tempfile::tempdir().unwrap();
        install_theme(
            themes.path(),
            "default",
            "[general]\nname = Default\nversion = 3.0.0\n",
        );
        install_theme(
            themes.path(),
            "dark",
            "[general]\nname = Dark\nversion = 1.2\n",
        );
        std::fs::create_dir_all(themes.path().join("no-descriptor")).unwrap();

        let config = ThemeConfig::new(themes.path())
            .with_app_url("https://pm.example.com")
            .with_app_dir("/app")
            .with_release_version("9.9.9");

        let incoming: HashMap<String, String> = incoming
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();

        Fixture {
            _themes: themes,
            config,
            session: Arc::new(MemorySession::new()),
            cookies: Arc::new(RequestCookies::new(incoming)),
        }
    }

    fn fixture() -> Fixture {
        fixture_with_cookies(&[])
    }

    impl Fixture {
        fn themes_root(&self) -> &Path {
            &self.config.themes_root
        }

        fn resolver_with(
            &self,
            identity: Identity,
            settings: Arc<dyn UserSettingsStore>,
            files: Arc<dyn FileResolver>,
        ) -> PreferenceResolver {
            let mut translator = CatalogTranslator::default();
            translator.insert("theme.no-descriptorname", "Untitled theme");
            let services = ThemeServices {
                config: Arc::new(self.config.clone()),
                settings,
                files,
                translator: Arc::new(translator),
            };
            PreferenceResolver::new(
                services,
                identity,
                self.session.clone(),
                self.cookies.clone(),
            )
        }

        fn resolver(
            &self,
            identity: Identity,
            settings: MemorySettingsStore,
        ) -> PreferenceResolver {
            self.resolver_with(
                identity,
                Arc::new(settings),
                Arc::new(MockFileResolver::new()),
            )
        }

        fn anonymous(&self) -> PreferenceResolver {
            self.resolver(Identity::anonymous(), MemorySettingsStore::new())
        }

        fn signed_in(&self) -> PreferenceResolver {
            self.resolver(
                Identity::user(Uuid::new_v4()),
                MemorySettingsStore::new(),
            )
        }
    }

    #[tokio::test]
    async fn anonymous_visitor_gets_hard_defaults_without_side_effects() {
        let fx = fixture();
        let resolver = fx.anonymous();

        assert_eq!(resolver.active().await, "default");
        assert_eq!(resolver.color_mode().await, "light-leantime");
        assert_eq!(resolver.font().await, "roboto");

        let theme = resolver.resolve(PreferenceKey::Theme).await.unwrap();
        assert_eq!(theme.source, Tier::HardDefault);
        assert_eq!(fx.cookies.pending_len(), 0);
        assert!(fx.session.snapshot().is_empty());
    }

    #[tokio::test]
    async fn uninstalled_theme_falls_back_to_default() {
        let fx = fixture();
        let resolver = fx.anonymous();

        for requested in ["ghost", "no-descriptor", "../default", ""] {
            let stored = resolver.set_active(requested).await;
            assert_eq!(stored, "default", "{requested}");
            assert_eq!(resolver.active().await, "default");
        }

        let cookie = fx.cookies.pending("theme").unwrap();
        assert_eq!(cookie.value, "default");
        assert_eq!(cookie.path, "/app/");
    }

    #[tokio::test]
    async fn authenticated_set_active_writes_session_and_cookie() {
        let fx = fixture();
        let resolver = fx.signed_in();

        assert_eq!(resolver.set_active("dark").await, "dark");
        assert_eq!(fx.session.get("usersettings.theme"), Some(json!("dark")));

        let resolved = resolver.resolve(PreferenceKey::Theme).await.unwrap();
        assert_eq!(
            resolved,
            ResolvedPreference::new(PreferenceKey::Theme, "dark", Tier::Session)
        );
        assert_eq!(fx.cookies.pending("theme").unwrap().value, "dark");
    }

    #[tokio::test]
    async fn anonymous_setters_only_queue_cookies() {
        let fx = fixture();
        let resolver = fx.anonymous();

        assert_eq!(resolver.set_color_mode("dark"), "dark");
        assert_eq!(resolver.set_font(""), "roboto");

        assert!(fx.session.snapshot().is_empty());
        assert_eq!(fx.cookies.pending("colorMode").unwrap().value, "dark");
        assert_eq!(fx.cookies.pending("themeFont").unwrap().value, "roboto");
    }

    #[tokio::test]
    async fn malformed_values_are_replaced_by_hard_defaults() {
        let fx = fixture_with_cookies(&[(
            "colorMode",
            "dark; Domain=evil.example; Path=/admin",
        )]);
        let resolver = fx.anonymous();

        let color = resolver.resolve(PreferenceKey::ColorMode).await.unwrap();
        assert_eq!(color.value, "light-leantime");
        assert_eq!(color.source, Tier::Cookie);
        assert_eq!(
            fx.cookies.pending("colorMode").unwrap().value,
            "light-leantime"
        );

        assert_eq!(resolver.set_color_mode("../../secrets"), "light-leantime");
        assert_eq!(resolver.set_font("mono; HttpOnly"), "roboto");
        assert_eq!(fx.cookies.pending("themeFont").unwrap().value, "roboto");

        for cookie in fx.cookies.drain() {
            assert!(!cookie.header_value().contains("evil"));
        }
    }

    #[tokio::test]
    async fn persisted_color_mode_is_promoted_and_then_served_from_session() {
        let fx = fixture();
        let user = Uuid::new_v4();

        let mut settings = MockUserSettingsStore::new();
        settings
            .expect_get_setting()
            .with(eq(format!("usersettings.{user}.colorMode")))
            .times(1)
            .returning(|_| Ok(Some("dark".to_string())));

        let resolver = fx.resolver_with(
            Identity::user(user),
            Arc::new(settings),
            Arc::new(MockFileResolver::new()),
        );

        let first = resolver.resolve(PreferenceKey::ColorMode).await.unwrap();
        assert_eq!(first.value, "dark");
        assert_eq!(first.source, Tier::PersistedUserSetting);

        let second = resolver.resolve(PreferenceKey::ColorMode).await.unwrap();
        assert_eq!(second.value, "dark");
        assert_eq!(second.source, Tier::Session);

        assert_eq!(fx.cookies.pending("colorMode").unwrap().value, "dark");
    }

    #[tokio::test]
    async fn persisted_setting_outranks_incoming_cookie() {
        let fx = fixture_with_cookies(&[
            ("theme", "default"),
            ("colorMode", "night"),
        ]);
        let user = Uuid::new_v4();
        let settings = MemorySettingsStore::new()
            .with_setting(format!("usersettings.{user}.theme"), "dark")
            .with_setting(format!("usersettings.{user}.colorMode"), "dusk");
        let resolver = fx.resolver(Identity::user(user), settings);

        let theme = resolver.resolve(PreferenceKey::Theme).await.unwrap();
        assert_eq!(
            theme,
            ResolvedPreference::new(
                PreferenceKey::Theme,
                "dark",
                Tier::PersistedUserSetting
            )
        );
        let color = resolver.resolve(PreferenceKey::ColorMode).await.unwrap();
        assert_eq!(color.value, "dusk");
        assert_eq!(color.source, Tier::PersistedUserSetting);

        assert_eq!(fx.cookies.pending("theme").unwrap().value, "dark");
        assert_eq!(fx.cookies.pending("colorMode").unwrap().value, "dusk");
    }

    #[tokio::test]
    async fn session_value_outranks_incoming_cookie() {
        let fx = fixture_with_cookies(&[("themeFont", "shantell")]);
        fx.session.set("usersettings.themeFont", json!("atkinson"));
        let resolver = fx.signed_in();

        let font = resolver.resolve(PreferenceKey::Font).await.unwrap();
        assert_eq!(
            font,
            ResolvedPreference::new(
                PreferenceKey::Font,
                "atkinson",
                Tier::Session
            )
        );
        assert_eq!(fx.cookies.pending_len(), 0);
    }

    #[tokio::test]
    async fn anonymous_caller_ignores_session_values() {
        let fx = fixture_with_cookies(&[("colorMode", "night")]);
        fx.session.set("usersettings.theme", json!("dark"));
        fx.session.set("usersettings.colorMode", json!("dusk"));
        let resolver = fx.anonymous();

        let theme = resolver.resolve(PreferenceKey::Theme).await.unwrap();
        assert_eq!(theme.value, "default");
        assert_eq!(theme.source, Tier::HardDefault);

        let color = resolver.resolve(PreferenceKey::ColorMode).await.unwrap();
        assert_eq!(color.value, "night");
        assert_eq!(color.source, Tier::Cookie);

        assert_eq!(
            fx.session.get("usersettings.colorMode"),
            Some(json!("dusk"))
        );
    }

    #[tokio::test]
    async fn settings_failure_falls_through_to_next_tier() {
        let fx = fixture_with_cookies(&[("themeFont", "atkinson")]);

        let mut settings = MockUserSettingsStore::new();
        settings
            .expect_get_setting()
            .returning(|_| Err(anyhow::anyhow!("database unavailable")));

        let resolver = fx.resolver_with(
            Identity::user(Uuid::new_v4()),
            Arc::new(settings),
            Arc::new(MockFileResolver::new()),
        );

        let font = resolver.resolve(PreferenceKey::Font).await.unwrap();
        assert_eq!(font.value, "atkinson");
        assert_eq!(font.source, Tier::Cookie);
        assert_eq!(
            fx.session.get("usersettings.themeFont"),
            Some(json!("atkinson"))
        );
    }

    #[tokio::test]
    async fn cookie_tier_is_normalized_and_refreshed() {
        let fx = fixture_with_cookies(&[
            ("theme", "dark"),
            ("colorMode", "dark-mode"),
        ]);
        let resolver = fx.anonymous();

        let theme = resolver.resolve(PreferenceKey::Theme).await.unwrap();
        assert_eq!(theme.value, "dark");
        assert_eq!(theme.source, Tier::Cookie);
        assert_eq!(resolver.color_mode().await, "dark-mode");

        assert_eq!(fx.cookies.pending("theme").unwrap().value, "dark");
        assert!(fx.session.snapshot().is_empty());

        let fx = fixture_with_cookies(&[("theme", "../../etc")]);
        assert_eq!(fx.anonymous().active().await, "default");
    }

    #[tokio::test]
    async fn configured_default_theme_is_used_before_hard_default() {
        let mut fx = fixture();
        fx.config = fx.config.clone().with_default_theme("dark");
        fx.config.default_color_mode = Some("dusk".into());
        let resolver = fx.anonymous();

        let theme = resolver.resolve(PreferenceKey::Theme).await.unwrap();
        assert_eq!(
            theme,
            ResolvedPreference::new(
                PreferenceKey::Theme,
                "dark",
                Tier::ConfigDefault
            )
        );
        assert_eq!(resolver.color_mode().await, "dusk");
        assert_eq!(fx.cookies.pending("theme").unwrap().value, "dark");
    }

    #[tokio::test]
    async fn font_cookie_is_last_write_wins() {
        let fx = fixture();
        let resolver = fx.signed_in();

        resolver.set_font("atkinson");
        resolver.set_font("shantell");

        let cookies = fx.cookies.drain();
        let fonts: Vec<_> =
            cookies.iter().filter(|c| c.name == "themeFont").collect();
        assert_eq!(fonts.len(), 1);
        assert_eq!(fonts[0].value, "shantell");
    }

    #[tokio::test]
    async fn gradient_background_removes_stored_image() {
        let fx = fixture();
        let resolver = fx.signed_in();

        resolver
            .set_background_image("https://images.example.com/sea.jpg")
            .await
            .unwrap();
        assert_eq!(resolver.background_type().await, BackgroundType::Image);
        assert_eq!(
            resolver.background_image().await.as_deref(),
            Some("https://images.example.com/sea.jpg")
        );

        resolver
            .set_background_type(BackgroundType::Gradient)
            .await
            .unwrap();
        assert_eq!(resolver.background_type().await, BackgroundType::Gradient);
        assert_eq!(resolver.background_image().await, None);
    }

    #[tokio::test]
    async fn anonymous_background_is_gradient_and_writes_are_ignored() {
        let fx = fixture();
        let store = Arc::new(MemorySettingsStore::new());
        let resolver = fx.resolver_with(
            Identity::anonymous(),
            store.clone(),
            Arc::new(MockFileResolver::new()),
        );

        resolver.set_background_image("https://x/y.png").await.unwrap();
        assert!(store.is_empty());
        assert_eq!(resolver.background_type().await, BackgroundType::Gradient);
        assert_eq!(resolver.background_image().await, None);
    }

    #[tokio::test]
    async fn uploaded_logo_is_resolved_once_per_session() {
        let fx = fixture();
        let signed = "https://cdn.example.com/acme.png?sig=1";

        let mut settings = MockUserSettingsStore::new();
        settings
            .expect_get_setting()
            .with(eq("companysettings.logoPath".to_string()))
            .times(1)
            .returning(|_| Ok(Some("logos/acme.png".to_string())));

        let mut files = MockFileResolver::new();
        files
            .expect_resolve_url()
            .withf(|reference, visibility, ttl| {
                reference == "logos/acme.png"
                    && *visibility == Visibility::Public
                    && *ttl == Duration::hours(24)
            })
            .times(1)
            .returning(move |_, _, _| Ok(Some(signed.to_string())));

        let resolver = fx.resolver_with(
            Identity::anonymous(),
            Arc::new(settings),
            Arc::new(files),
        );

        let first = resolver.logo_url().await;
        let second = resolver.logo_url().await;
        assert_eq!(first.as_deref(), Some(signed));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn missing_logo_is_cached_as_a_miss() {
        let fx = fixture();

        let mut settings = MockUserSettingsStore::new();
        settings.expect_get_setting().times(1).returning(|_| Ok(None));

        let resolver = fx.resolver_with(
            Identity::anonymous(),
            Arc::new(settings),
            Arc::new(MockFileResolver::new()),
        );

        assert_eq!(resolver.logo_url().await, None);
        assert_eq!(resolver.logo_url().await, None);
        assert_eq!(
            fx.session.get("companysettings.logoPath"),
            Some(json!(false))
        );
    }

    #[tokio::test]
    async fn unresolvable_upload_is_cached_as_a_miss() {
        let fx = fixture();

        let mut settings = MockUserSettingsStore::new();
        settings
            .expect_get_setting()
            .times(1)
            .returning(|_| Ok(Some("logos/deleted.png".to_string())));
        let mut files = MockFileResolver::new();
        files
            .expect_resolve_url()
            .times(1)
            .returning(|_, _, _| Ok(None));

        let resolver = fx.resolver_with(
            Identity::anonymous(),
            Arc::new(settings),
            Arc::new(files),
        );

        assert_eq!(resolver.logo_url().await, None);
        assert_eq!(resolver.logo_url().await, None);
    }

    #[tokio::test]
    async fn external_logo_url_skips_file_resolution() {
        let fx = fixture();
        let settings = MemorySettingsStore::new().with_setting(
            "companysettings.logoPath",
            "https://brand.example.com/logo.svg",
        );
        let resolver = fx.resolver(Identity::anonymous(), settings);

        assert_eq!(
            resolver.logo_url().await.as_deref(),
            Some("https://brand.example.com/logo.svg")
        );
        assert_eq!(
            resolver.default_logo_url(),
            "https://pm.example.com/dist/images/logo.svg"
        );
    }

    #[tokio::test]
    async fn descriptor_is_cached_until_theme_changes() {
        let fx = fixture();
        let resolver = fx.signed_in();

        resolver.set_active("default").await;
        assert_eq!(resolver.name().await, "Default");
        assert_eq!(resolver.version().await, "3.0.0");

        std::fs::write(
            fx.themes_root().join("default/theme.ini"),
            "[general]\nname = Renamed\n",
        )
        .unwrap();
        assert_eq!(resolver.name().await, "Default");

        resolver.set_active("dark").await;
        assert_eq!(resolver.name().await, "Dark");
        assert_eq!(resolver.version().await, "1.2");

        resolver.set_active("default").await;
        assert_eq!(resolver.name().await, "Renamed");
        assert_eq!(resolver.version().await, "");
    }

    #[tokio::test]
    async fn broken_descriptor_falls_back_to_translation() {
        let fx = fixture();
        std::fs::write(
            fx.themes_root().join("dark/theme.ini"),
            "[general\nname",
        )
        .unwrap();
        let resolver = fx.signed_in();

        fx.session.set("usersettings.theme", json!("dark"));
        assert_eq!(resolver.name().await, "theme.darkname");
        assert_eq!(resolver.version().await, "");

        fx.session.set("usersettings.theme", json!("no-descriptor"));
        assert_eq!(resolver.name().await, "Untitled theme");
    }

    #[tokio::test]
    async fn asset_urls_follow_active_theme_and_color_mode() {
        let fx = fixture();
        let root = fx.themes_root();
        std::fs::write(root.join("dark/css/night.min.css"), "").unwrap();
        std::fs::write(root.join("dark/css/custom.css"), "").unwrap();
        std::fs::write(root.join("dark/js/theme.js"), "").unwrap();

        let resolver = fx.signed_in();
        resolver.set_active("dark").await;
        resolver.set_color_mode("night");

        let base = "https://pm.example.com/theme";
        assert_eq!(
            resolver.style_url().await,
            Some(format!("{base}/dark/css/night.min.css?v=9.9.9"))
        );
        assert_eq!(
            resolver.custom_style_url().await,
            Some(format!("{base}/dark/css/custom.css?v=9.9.9"))
        );
        assert_eq!(
            resolver.js_url().await,
            Some(format!("{base}/dark/js/theme.js?v=9.9.9"))
        );
        assert_eq!(resolver.custom_js_url().await, None);

        assert_eq!(resolver.dir().await, root.join("dark"));
        assert_eq!(resolver.url().await, format!("{base}/dark"));
        assert_eq!(resolver.default_dir(), root.join("default"));
        assert_eq!(resolver.default_url(), format!("{base}/default"));
    }

    #[tokio::test]
    async fn clear_cache_forgets_session_values() {
        let fx = fixture();
        let resolver = fx.signed_in();

        resolver.set_active("dark").await;
        resolver.set_color_mode("dusk");
        resolver.set_font("atkinson");
        fx.session.set("usersettings.colorScheme", json!("blue"));

        resolver.clear_cache();

        for key in CACHED_SESSION_KEYS {
            assert!(!fx.session.exists(key), "{key}");
        }
    }

    #[tokio::test]
    async fn save_user_setting_is_scoped_to_user() {
        let fx = fixture();
        let user = Uuid::new_v4();
        let store = Arc::new(MemorySettingsStore::new());
        let resolver = fx.resolver_with(
            Identity::user(user),
            store.clone(),
            Arc::new(MockFileResolver::new()),
        );

        resolver
            .save_user_setting(PreferenceKey::Font, "shantell")
            .await
            .unwrap();
        assert_eq!(
            store
                .get_setting(&format!("usersettings.{user}.themeFont"))
                .await
                .unwrap()
                .as_deref(),
            Some("shantell")
        );
    }

    #[tokio::test]
    async fn lists_installed_themes_and_fonts() {
        let fx = fixture();
        let resolver = fx.anonymous();

        let themes = resolver.list_all().await;
        assert_eq!(themes.keys().collect::<Vec<_>>(), ["dark", "default"]);
        assert_eq!(resolver.available_fonts().len(), 3);
    }
}
