use axum::{
    Router,
    routing::{get, put},
};

use crate::{handlers::theme_handlers, infra::app_state::AppState};

/// Create all v1 API routes
pub fn create_v1_router(_state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/theme",
            get(theme_handlers::get_theme).put(theme_handlers::update_theme),
        )
        .route("/theme/background", put(theme_handlers::update_background))
        .route("/themes", get(theme_handlers::list_themes))
        .route("/fonts", get(theme_handlers::list_fonts))
}
