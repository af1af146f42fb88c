//! Cookie-keyed server sessions and the per-request theme context.
//!
//! Sessions are opaque to the client: the `livery_session` cookie carries a
//! random id, the data stays in process memory. A request becomes
//! authenticated once something stores a user id under `userdata.id`.

use std::{
    fmt,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{extract::FromRequestParts, http::request::Parts};
use dashmap::DashMap;
use livery_core::{
    CookieJar, Identity, PreferenceResolver, SessionStore,
    cookies::{OutgoingCookie, RequestCookies},
    infra::MemorySession,
};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::infra::{app_state::AppState, errors::AppError};

pub const SESSION_COOKIE: &str = "livery_session";

/// Session key holding the authenticated user's id.
pub const USER_ID_KEY: &str = "userdata.id";

struct SessionEntry {
    data: Arc<MemorySession>,
    last_seen: Mutex<Instant>,
}

impl SessionEntry {
    fn new() -> Self {
        Self {
            data: Arc::new(MemorySession::new()),
            last_seen: Mutex::new(Instant::now()),
        }
    }

    fn touch(&self) {
        *self.last_seen.lock() = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        self.last_seen.lock().elapsed()
    }
}

/// All live sessions of this process.
pub struct SessionRegistry {
    sessions: DashMap<Uuid, SessionEntry>,
    idle_timeout: Duration,
}

impl fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.sessions.len())
            .field("idle_timeout", &self.idle_timeout)
            .finish()
    }
}

impl SessionRegistry {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            idle_timeout,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Creates an empty session and returns its id.
    pub fn create(&self) -> (Uuid, Arc<MemorySession>) {
        let id = Uuid::new_v4();
        let entry = SessionEntry::new();
        let data = entry.data.clone();
        self.sessions.insert(id, entry);
        (id, data)
    }

    pub fn get(&self, id: Uuid) -> Option<Arc<MemorySession>> {
        self.sessions.get(&id).and_then(|entry| {
            if entry.idle_for() > self.idle_timeout {
                None
            } else {
                entry.touch();
                Some(entry.data.clone())
            }
        })
    }

    /// Returns the request's session, creating one and queueing its cookie
    /// when the incoming cookie is missing, malformed or expired.
    pub fn attach(
        &self,
        cookies: &RequestCookies,
        cookie_path: &str,
    ) -> Arc<MemorySession> {
        let existing = cookies
            .incoming(SESSION_COOKIE)
            .and_then(|raw| Uuid::parse_str(&raw).ok())
            .and_then(|id| self.get(id));

        if let Some(session) = existing {
            return session;
        }

        let (id, session) = self.create();
        debug!(session_id = %id, "issued new session");
        let cookie = OutgoingCookie::preference(
            SESSION_COOKIE,
            id.to_string(),
            cookie_path,
        );
        cookies.queue(cookie.http_only());
        session
    }

    /// Drops sessions idle for longer than the timeout.
    pub fn prune(&self) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, entry| entry.idle_for() <= self.idle_timeout);
        let removed = before.saturating_sub(self.sessions.len());
        if removed > 0 {
            debug!(removed, "pruned idle sessions");
        }
        removed
    }
}

/// Reads the authenticated user from `userdata.id`.
pub fn identity_of(session: &dyn SessionStore) -> Identity {
    match session.get(USER_ID_KEY) {
        Some(Value::String(raw)) => match Uuid::parse_str(&raw) {
            Ok(user_id) => Identity::user(user_id),
            Err(err) => {
                warn!(error = %err, "ignoring malformed user id in session");
                Identity::anonymous()
            }
        },
        _ => Identity::anonymous(),
    }
}

/// Everything a handler needs to read or change theme preferences.
#[derive(Debug)]
pub struct ThemeContext {
    pub resolver: PreferenceResolver,
    pub session: Arc<MemorySession>,
}

impl ThemeContext {
    pub fn identity(&self) -> Identity {
        self.resolver.identity()
    }
}

impl FromRequestParts<AppState> for ThemeContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let cookies = parts
            .extensions
            .get::<Arc<RequestCookies>>()
            .cloned()
            .ok_or_else(|| {
                AppError::internal("preference cookie layer is not installed")
            })?;

        let session = state
            .sessions
            .attach(&cookies, &state.config.theme.cookie_path());
        let identity = identity_of(session.as_ref());

        let resolver = PreferenceResolver::new(
            state.theme.clone(),
            identity,
            session.clone(),
            cookies,
        );

        Ok(Self { resolver, session })
    }
}
