use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ThemeError;

/// Theme id used whenever nothing valid was requested.
pub const DEFAULT_THEME: &str = "default";
/// Color mode used when nothing else applies.
pub const DEFAULT_COLOR_MODE: &str = "light-leantime";
/// Font used when nothing else applies.
pub const DEFAULT_FONT: &str = "roboto";

/// Every preference the resolver knows how to look up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreferenceKey {
    /// Active theme id, a directory below the themes root.
    Theme,
    /// Color mode; also the stylesheet name inside the theme.
    ColorMode,
    /// UI font key.
    Font,
    /// `gradient` or `image`.
    BackgroundType,
    /// URL of the background image.
    BackgroundImage,
    /// Uploaded company logo reference or absolute URL.
    CompanyLogo,
}

/// Plain identifier: ASCII letters, digits, `-`, `_` and single dots.
///
/// Values of this shape are safe both as cookie values and as file name
/// stems below a theme directory.
fn is_plain_token(value: &str) -> bool {
    !value.is_empty()
        && !value.contains("..")
        && value.bytes().all(|b| {
            b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.')
        })
}

impl PreferenceKey {
    /// Value used when no tier holds one.
    pub fn hard_default(self) -> Option<&'static str> {
        match self {
            Self::Theme => Some(DEFAULT_THEME),
            Self::ColorMode => Some(DEFAULT_COLOR_MODE),
            Self::Font => Some(DEFAULT_FONT),
            Self::BackgroundType => Some(BackgroundType::Gradient.as_str()),
            Self::BackgroundImage | Self::CompanyLogo => None,
        }
    }

    /// Shape check only. Theme existence on disk is verified separately.
    pub fn accepts(self, value: &str) -> bool {
        match self {
            Self::Theme | Self::ColorMode | Self::Font => is_plain_token(value),
            Self::BackgroundType => value.parse::<BackgroundType>().is_ok(),
            Self::BackgroundImage | Self::CompanyLogo => !value.is_empty(),
        }
    }

    /// Session key, for the keys that are cached in the session.
    pub fn session_key(self) -> Option<&'static str> {
        match self {
            Self::Theme => Some("usersettings.theme"),
            Self::ColorMode => Some("usersettings.colorMode"),
            Self::Font => Some("usersettings.themeFont"),
            Self::CompanyLogo => Some("companysettings.logoPath"),
            Self::BackgroundType | Self::BackgroundImage => None,
        }
    }

    /// Name of the persisted setting below its scope prefix.
    pub fn setting_name(self) -> &'static str {
        match self {
            Self::Theme => "theme",
            Self::ColorMode => "colorMode",
            Self::Font => "themeFont",
            Self::BackgroundType => "backgroundType",
            Self::BackgroundImage => "backgroundImage",
            Self::CompanyLogo => "logoPath",
        }
    }

    /// Cookie carrying the preference for anonymous visitors.
    pub fn cookie_name(self) -> Option<&'static str> {
        match self {
            Self::Theme => Some("theme"),
            Self::ColorMode => Some("colorMode"),
            Self::Font => Some("themeFont"),
            _ => None,
        }
    }

    /// Keys resolved through the full session/setting/cookie/default chain.
    pub fn is_chained(self) -> bool {
        matches!(self, Self::Theme | Self::ColorMode | Self::Font)
    }

    /// `usersettings.<user>.<name>` for user keys, `companysettings.<name>`
    /// for the company logo.
    pub fn scoped_setting(self, user_id: Option<Uuid>) -> Option<String> {
        match (self, user_id) {
            (Self::CompanyLogo, _) => {
                Some(format!("companysettings.{}", self.setting_name()))
            }
            (_, Some(user_id)) => Some(format!(
                "usersettings.{user_id}.{}",
                self.setting_name()
            )),
            (_, None) => None,
        }
    }
}

impl fmt::Display for PreferenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.setting_name())
    }
}

/// Precedence level a value was found at, fastest first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Cached in the authenticated caller's session.
    Session,
    /// Stored in the user settings store.
    PersistedUserSetting,
    /// Sent by the client as a cookie.
    Cookie,
    /// Deployment-wide default from [`crate::ThemeConfig`].
    ConfigDefault,
    /// Built-in fallback.
    HardDefault,
}

/// A looked-up value together with the tier that answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedPreference {
    /// Preference that was looked up.
    pub key: PreferenceKey,
    /// Value after normalization.
    pub value: String,
    /// Tier the value came from.
    pub source: Tier,
}

impl ResolvedPreference {
    /// Bundles a value with its origin.
    pub fn new(
        key: PreferenceKey,
        value: impl Into<String>,
        source: Tier,
    ) -> Self {
        Self {
            key,
            value: value.into(),
            source,
        }
    }
}

/// Page background style.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundType {
    /// Theme gradient, no image.
    #[default]
    Gradient,
    /// User supplied image.
    Image,
}

impl BackgroundType {
    /// Stored string form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gradient => "gradient",
            Self::Image => "image",
        }
    }
}

impl fmt::Display for BackgroundType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackgroundType {
    type Err = ThemeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gradient" => Ok(Self::Gradient),
            "image" => Ok(Self::Image),
            other => Err(ThemeError::InvalidValue {
                key: "backgroundType",
                value: other.to_string(),
            }),
        }
    }
}

/// A selectable UI font.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FontChoice {
    /// Value stored as the font preference.
    pub key: &'static str,
    /// Display name.
    pub label: &'static str,
    /// Accessibility hint shown next to the option.
    pub tooltip: &'static str,
}

/// Fonts offered in the theme settings.
pub const FONTS: &[FontChoice] = &[
    FontChoice {
        key: "roboto",
        label: "Roboto",
        tooltip: "Designed to be easy to read on a variety of devices.",
    },
    FontChoice {
        key: "atkinson",
        label: "Atkinson Hyperlegible",
        tooltip: "Atkinson was specifically developed for readers with \
                  low vision.",
    },
    FontChoice {
        key: "shantell",
        label: "Shantell Sans",
        tooltip: "The shape of the letters and increased spacing makes \
                  words less crowded and easier to read.",
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theme_ids_reject_path_components() {
        assert!(PreferenceKey::Theme.accepts("dark-blue"));
        assert!(!PreferenceKey::Theme.accepts(""));
        assert!(!PreferenceKey::Theme.accepts("../etc"));
        assert!(!PreferenceKey::Theme.accepts("a/b"));
        assert!(!PreferenceKey::Theme.accepts("a\\b"));
    }

    #[test]
    fn color_mode_and_font_must_be_plain_tokens() {
        assert!(PreferenceKey::ColorMode.accepts("light-leantime"));
        assert!(PreferenceKey::ColorMode.accepts("high_contrast.v2"));
        assert!(PreferenceKey::Font.accepts("comic"));
        assert!(!PreferenceKey::Font.accepts(""));

        for hostile in [
            "dark; Domain=evil.example",
            "x,y",
            "two words",
            "tab\there",
            "../../secrets",
            "css/dark",
            "dark\\mode",
            "quote\"d",
        ] {
            assert!(!PreferenceKey::ColorMode.accepts(hostile), "{hostile}");
            assert!(!PreferenceKey::Font.accepts(hostile), "{hostile}");
        }
    }

    #[test]
    fn only_theme_color_mode_and_font_are_chained() {
        let chained: Vec<_> = [
            PreferenceKey::Theme,
            PreferenceKey::ColorMode,
            PreferenceKey::Font,
            PreferenceKey::BackgroundType,
            PreferenceKey::BackgroundImage,
            PreferenceKey::CompanyLogo,
        ]
        .into_iter()
        .filter(|key| key.is_chained())
        .collect();
        assert_eq!(
            chained,
            [
                PreferenceKey::Theme,
                PreferenceKey::ColorMode,
                PreferenceKey::Font
            ]
        );
    }

    #[test]
    fn scoped_settings_follow_namespace_layout() {
        let user = Uuid::nil();
        assert_eq!(
            PreferenceKey::ColorMode.scoped_setting(Some(user)).as_deref(),
            Some("usersettings.00000000-0000-0000-0000-000000000000.colorMode")
        );
        assert_eq!(PreferenceKey::Font.scoped_setting(None), None);
        assert_eq!(
            PreferenceKey::CompanyLogo.scoped_setting(None).as_deref(),
            Some("companysettings.logoPath")
        );
    }

    #[test]
    fn background_type_parses_known_values_only() {
        assert_eq!(
            "image".parse::<BackgroundType>().ok(),
            Some(BackgroundType::Image)
        );
        assert!("video".parse::<BackgroundType>().is_err());
        assert!(PreferenceKey::BackgroundType.accepts("gradient"));
        assert!(!PreferenceKey::BackgroundType.accepts("video"));
    }
}
