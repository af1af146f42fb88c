use axum::{Json, extract::State};
use livery_core::{
    BackgroundType, FontChoice, PreferenceKey, PreferenceResolver,
    theme::{AssetKind, CUSTOM_CSS, CUSTOM_JS, THEME_JS, ThemeCatalog},
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::infra::{
    app_state::AppState,
    errors::{AppError, AppResult},
    session::ThemeContext,
};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: "success".to_string(),
            data: Some(data),
        }
    }
}

/// Everything a page needs to render the caller's theme.
#[derive(Debug, Serialize)]
pub struct ThemeSnapshot {
    pub theme: String,
    pub color_mode: String,
    pub font: String,
    pub name: String,
    pub version: String,
    pub background_type: BackgroundType,
    pub background_image: Option<String>,
    pub logo_url: String,
    pub style_url: Option<String>,
    pub js_url: Option<String>,
    pub custom_style_url: Option<String>,
    pub custom_js_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateThemeRequest {
    pub theme: Option<String>,
    pub color_mode: Option<String>,
    pub font: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBackgroundRequest {
    #[serde(rename = "type")]
    pub background_type: BackgroundType,
    pub image: Option<String>,
}

/// Values just written by a setter. They win over a fresh lookup, which
/// would re-read the request's stale cookies and queue them again.
#[derive(Debug, Default)]
struct Selected {
    theme: Option<String>,
    color_mode: Option<String>,
    font: Option<String>,
}

async fn snapshot(
    resolver: &PreferenceResolver,
    selected: Selected,
) -> ThemeSnapshot {
    let theme = match selected.theme {
        Some(theme) => theme,
        None => resolver.active().await,
    };
    let color_mode = match selected.color_mode {
        Some(color_mode) => color_mode,
        None => resolver.color_mode().await,
    };
    let font = match selected.font {
        Some(font) => font,
        None => resolver.font().await,
    };

    let assets = resolver.assets();
    let style_url =
        assets.asset_url(&theme, &color_mode, AssetKind::Css).await;
    let js_url = assets.asset_url(&theme, THEME_JS, AssetKind::Js).await;
    let custom_style_url =
        assets.asset_url(&theme, CUSTOM_CSS, AssetKind::Css).await;
    let custom_js_url =
        assets.asset_url(&theme, CUSTOM_JS, AssetKind::Js).await;

    let logo_url = match resolver.logo_url().await {
        Some(url) => url,
        None => resolver.default_logo_url(),
    };

    ThemeSnapshot {
        name: resolver.name_of(&theme).await,
        version: resolver.version_of(&theme).await,
        background_type: resolver.background_type().await,
        background_image: resolver.background_image().await,
        theme,
        color_mode,
        font,
        logo_url,
        style_url,
        js_url,
        custom_style_url,
        custom_js_url,
    }
}

/// Resolve the caller's theme preferences
pub async fn get_theme(
    context: ThemeContext,
) -> AppResult<Json<ApiResponse<ThemeSnapshot>>> {
    let snapshot = snapshot(&context.resolver, Selected::default()).await;
    Ok(Json(ApiResponse::success(snapshot)))
}

/// Change theme, color mode or font
///
/// Values are normalized by the resolver; the response carries what was
/// actually stored. Authenticated callers also get them persisted.
pub async fn update_theme(
    context: ThemeContext,
    Json(request): Json<UpdateThemeRequest>,
) -> AppResult<Json<ApiResponse<ThemeSnapshot>>> {
    let resolver = &context.resolver;
    let mut selected = Selected::default();

    if let Some(theme) = request.theme.as_deref() {
        let stored = resolver.set_active(theme).await;
        resolver.save_user_setting(PreferenceKey::Theme, &stored).await?;
        selected.theme = Some(stored);
    }

    if let Some(color_mode) = request.color_mode.as_deref() {
        let stored = resolver.set_color_mode(color_mode);
        resolver
            .save_user_setting(PreferenceKey::ColorMode, &stored)
            .await?;
        selected.color_mode = Some(stored);
    }

    if let Some(font) = request.font.as_deref() {
        let stored = resolver.set_font(font);
        resolver.save_user_setting(PreferenceKey::Font, &stored).await?;
        selected.font = Some(stored);
    }

    info!(
        user = ?context.identity().user_id(),
        theme = ?selected.theme,
        color_mode = ?selected.color_mode,
        font = ?selected.font,
        "theme preferences updated"
    );

    let snapshot = snapshot(resolver, selected).await;
    Ok(Json(ApiResponse::success(snapshot)))
}

/// Change the background of the authenticated caller
pub async fn update_background(
    context: ThemeContext,
    Json(request): Json<UpdateBackgroundRequest>,
) -> AppResult<Json<ApiResponse<ThemeSnapshot>>> {
    if !context.identity().is_authenticated() {
        return Err(AppError::unauthorized(
            "Sign in to change the background",
        ));
    }
    let resolver = &context.resolver;

    match request.background_type {
        BackgroundType::Image => {
            let image = request
                .image
                .as_deref()
                .filter(|image| !image.trim().is_empty())
                .ok_or_else(|| {
                    AppError::bad_request(
                        "An image background needs an image URL",
                    )
                })?;
            resolver.set_background_image(image).await?;
        }
        BackgroundType::Gradient => {
            resolver.set_background_type(BackgroundType::Gradient).await?;
        }
    }

    let snapshot = snapshot(resolver, Selected::default()).await;
    Ok(Json(ApiResponse::success(snapshot)))
}

/// List installed themes
pub async fn list_themes(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<ThemeCatalog>>> {
    let catalog =
        livery_core::theme::list_themes(state.config.themes_root()).await;
    Ok(Json(ApiResponse::success(catalog)))
}

/// List selectable fonts
pub async fn list_fonts()
-> AppResult<Json<ApiResponse<&'static [FontChoice]>>> {
    Ok(Json(ApiResponse::success(livery_core::preference::FONTS)))
}
