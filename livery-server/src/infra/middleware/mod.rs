pub mod preference_cookies;

pub use preference_cookies::{PreferenceCookieLayer, PreferenceCookieMiddleware};
