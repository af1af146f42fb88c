use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use tracing::{trace, warn};

use crate::ports::CookieJar;

/// Lifetime of preference cookies.
pub const PREFERENCE_COOKIE_TTL_DAYS: i64 = 30;

/// True when `value` consists of RFC 6265 cookie-octets only.
///
/// Rejects whitespace, control characters, `"`, `,`, `;` and `\`, so a
/// value can never open a new cookie attribute.
pub fn is_cookie_value(value: &str) -> bool {
    value.bytes().all(|b| {
        matches!(
            b,
            0x21 | 0x23..=0x2B | 0x2D..=0x3A | 0x3C..=0x5B | 0x5D..=0x7E
        )
    })
}

/// A cookie waiting to be attached to the outgoing response.
///
/// Always rendered with `SameSite=Strict`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingCookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value, written verbatim.
    pub value: String,
    /// Absolute expiry; `Max-Age` is derived from it at render time.
    pub expires: DateTime<Utc>,
    /// `Path` attribute.
    pub path: String,
    /// Adds the `HttpOnly` attribute.
    pub http_only: bool,
}

impl OutgoingCookie {
    /// Strict same-site preference cookie valid for thirty days.
    pub fn preference(
        name: impl Into<String>,
        value: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            expires: Utc::now() + Duration::days(PREFERENCE_COOKIE_TTL_DAYS),
            path: path.into(),
            http_only: false,
        }
    }

    /// Hides the cookie from scripts.
    pub fn http_only(mut self) -> Self {
        self.http_only = true;
        self
    }

    /// Renders the `Set-Cookie` header value.
    pub fn header_value(&self) -> String {
        let max_age = (self.expires - Utc::now()).num_seconds().max(0);
        let mut header = format!(
            "{}={}; Expires={}; Max-Age={}; Path={}; SameSite=Strict",
            self.name,
            self.value,
            self.expires.format("%a, %d %b %Y %H:%M:%S GMT"),
            max_age,
            self.path,
        );
        if self.http_only {
            header.push_str("; HttpOnly");
        }
        header
    }
}

/// Splits a `Cookie` request header into name/value pairs.
pub fn parse_cookie_header(header: &str) -> HashMap<String, String> {
    header
        .split(';')
        .filter_map(|cookie| {
            let (name, value) = cookie.trim().split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                None
            } else {
                Some((name.to_string(), value.trim().to_string()))
            }
        })
        .collect()
}

/// Cookie state of one request: what came in, and what goes out.
///
/// Outgoing cookies are keyed by name so repeated writes collapse to the
/// last one. [`RequestCookies::drain`] hands them over exactly once.
#[derive(Debug, Default)]
pub struct RequestCookies {
    incoming: HashMap<String, String>,
    pending: Mutex<BTreeMap<String, OutgoingCookie>>,
}

impl RequestCookies {
    /// Wraps already parsed request cookies.
    pub fn new(incoming: HashMap<String, String>) -> Self {
        Self {
            incoming,
            pending: Mutex::new(BTreeMap::new()),
        }
    }

    /// Builds the jar from a raw `Cookie` header, if any.
    pub fn from_header(header: Option<&str>) -> Self {
        Self::new(header.map(parse_cookie_header).unwrap_or_default())
    }

    /// Number of cookies queued for the response.
    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Queued cookie with the given name.
    pub fn pending(&self, name: &str) -> Option<OutgoingCookie> {
        self.pending.lock().get(name).cloned()
    }

    /// Takes every queued cookie, leaving the pending map empty.
    pub fn drain(&self) -> Vec<OutgoingCookie> {
        std::mem::take(&mut *self.pending.lock())
            .into_values()
            .collect()
    }
}

impl CookieJar for RequestCookies {
    fn incoming(&self, name: &str) -> Option<String> {
        self.incoming.get(name).cloned()
    }

    fn queue(&self, cookie: OutgoingCookie) {
        if !is_cookie_value(&cookie.value) {
            warn!(name = %cookie.name, "dropping cookie with unsafe value");
            return;
        }
        trace!(name = %cookie.name, "queueing outgoing cookie");
        self.pending.lock().insert(cookie.name.clone(), cookie);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cookie_header_pairs() {
        let cookies =
            parse_cookie_header("theme=dark; colorMode=dark-mode;bad");
        assert_eq!(cookies.get("theme").map(String::as_str), Some("dark"));
        assert_eq!(
            cookies.get("colorMode").map(String::as_str),
            Some("dark-mode")
        );
        assert!(!cookies.contains_key("bad"));
    }

    #[test]
    fn queue_collapses_to_last_write_per_name() {
        let jar = RequestCookies::default();
        jar.queue(OutgoingCookie::preference("themeFont", "atkinson", "/"));
        jar.queue(OutgoingCookie::preference("themeFont", "shantell", "/"));
        jar.queue(OutgoingCookie::preference("theme", "default", "/"));

        let drained = jar.drain();
        assert_eq!(drained.len(), 2);
        let font = drained.iter().find(|c| c.name == "themeFont").unwrap();
        assert_eq!(font.value, "shantell");
        assert!(jar.drain().is_empty());
    }

    #[test]
    fn header_value_carries_strict_attributes() {
        let cookie = OutgoingCookie::preference("theme", "default", "/app/");
        let header = cookie.header_value();
        assert!(header.starts_with("theme=default; Expires="));
        assert!(header.contains("Path=/app/"));
        assert!(header.contains("SameSite=Strict"));
        assert!(header.contains("GMT"));
        assert!(!header.contains("HttpOnly"));
        assert!(
            cookie.clone().http_only().header_value().ends_with("HttpOnly")
        );
    }

    #[test]
    fn cookie_values_exclude_attribute_separators() {
        assert!(is_cookie_value("light-leantime"));
        assert!(is_cookie_value("3f1c2a9e-0000-4000-8000-000000000000"));
        assert!(is_cookie_value(""));
        assert!(!is_cookie_value("dark; Domain=evil.example"));
        assert!(!is_cookie_value("a,b"));
        assert!(!is_cookie_value("two words"));
        assert!(!is_cookie_value("line\r\nbreak"));
        assert!(!is_cookie_value("quote\"d"));
        assert!(!is_cookie_value("back\\slash"));
    }

    #[test]
    fn unsafe_values_are_never_queued() {
        let jar = RequestCookies::default();
        jar.queue(OutgoingCookie::preference(
            "colorMode",
            "dark; Domain=evil.example; Path=/admin",
            "/",
        ));
        assert_eq!(jar.pending_len(), 0);

        jar.queue(OutgoingCookie::preference("colorMode", "dark", "/"));
        jar.queue(OutgoingCookie::preference("colorMode", "x;y", "/"));
        assert_eq!(
            jar.pending("colorMode").map(|c| c.value).as_deref(),
            Some("dark")
        );
    }
}
