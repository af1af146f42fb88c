//! # Livery Core
//!
//! Per-request resolution of UI theme preferences for a web application.
//!
//! ## Overview
//!
//! `livery-core` answers four questions for every request: which theme is
//! active, which color mode and font are selected, and where the company
//! logo lives. Each answer walks a precedence chain of tiers (session,
//! persisted user setting, cookie, configured default, hard default) and
//! promotes what it finds into the faster tiers.
//!
//! On top of the resolved theme id it computes asset URLs
//! ([`theme::ThemeAssets`]), reads theme descriptors (`theme.ini`) and
//! enumerates installed themes.
//!
//! ## Architecture
//!
//! - [`ports`]: traits for the session, settings store, cookie jar, file
//!   resolver and translator the resolver depends on
//! - [`resolver`]: the [`PreferenceResolver`] itself
//! - [`cookies`]: deferred outgoing cookies, collapsed per name and flushed
//!   once when the response is finalized
//! - [`theme`]: descriptor loading, asset lookup and the theme catalog
//! - [`infra`]: in-memory and file-backed adapters for the ports
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use livery_core::{
//!     Identity, PreferenceResolver, ThemeConfig, ThemeServices,
//!     cookies::RequestCookies,
//!     infra::{
//!         CatalogTranslator, LocalFileResolver, MemorySession,
//!         MemorySettingsStore,
//!     },
//! };
//!
//! async fn render() {
//!     let services = ThemeServices {
//!         config: Arc::new(ThemeConfig::new("./theme")),
//!         settings: Arc::new(MemorySettingsStore::new()),
//!         files: Arc::new(LocalFileResolver::new("./storage", "/files")),
//!         translator: Arc::new(CatalogTranslator::default()),
//!     };
//!     let header = Some("theme=default");
//!     let cookies = Arc::new(RequestCookies::from_header(header));
//!     let resolver = PreferenceResolver::new(
//!         services,
//!         Identity::anonymous(),
//!         Arc::new(MemorySession::new()),
//!         cookies.clone(),
//!     );
//!
//!     println!("theme: {}", resolver.active().await);
//!     for cookie in cookies.drain() {
//!         println!("Set-Cookie: {}", cookie.header_value());
//!     }
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

/// Static configuration for theme resolution
pub mod config;

/// Deferred response cookies
pub mod cookies;

/// Error types and error handling utilities
pub mod error;

/// Adapters implementing the ports
pub mod infra;

/// Collaborator traits
pub mod ports;

/// Preference keys, tiers and resolved values
pub mod preference;

/// The precedence-chain resolver
pub mod resolver;

/// Theme descriptors, assets and catalog
pub mod theme;

pub use config::ThemeConfig;
pub use error::{Result, ThemeError};
pub use ports::{
    CookieJar, FileResolver, Identity, SessionStore, Translator,
    UserSettingsStore, Visibility,
};
pub use preference::{
    BackgroundType, FontChoice, PreferenceKey, ResolvedPreference, Tier,
};
pub use resolver::{PreferenceResolver, ThemeServices};
