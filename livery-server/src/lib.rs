//! # Livery Server
//!
//! HTTP integration of [`livery_core`].
//!
//! ## Overview
//!
//! - **Preference API**: read and change the caller's theme, color mode,
//!   font and background under `/api/v1`
//! - **Theme assets**: files below the themes root are served at `/theme`
//! - **Uploads**: files below the storage root are served at `/files`,
//!   where the default storage base URL points
//! - **Deferred cookies**: preference cookies queued while handling a
//!   request are written once, by [`PreferenceCookieLayer`], when the
//!   response is finalized
//! - **Sessions**: in-memory, keyed by the `livery_session` cookie
//!
//! [`PreferenceCookieLayer`]: infra::middleware::PreferenceCookieLayer

pub mod handlers;
pub mod infra;
pub mod routes;

pub use infra::app_state::AppState;

use axum::Router;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::infra::middleware::PreferenceCookieLayer;

pub fn create_app(state: AppState) -> Router {
    let themes = ServeDir::new(state.config.themes_root());
    let uploads = ServeDir::new(&state.config.storage.root);

    routes::create_api_router(state.clone())
        .nest_service("/theme", themes)
        .nest_service("/files", uploads)
        .layer(PreferenceCookieLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
