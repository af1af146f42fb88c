use std::{fmt, sync::Arc};

use livery_core::ThemeServices;

use crate::infra::{config::Config, session::SessionRegistry};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Collaborators shared by every request's resolver.
    pub theme: ThemeServices,
    pub sessions: Arc<SessionRegistry>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("sessions", &self.sessions)
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(config: Config, theme: ThemeServices) -> Self {
        let sessions =
            Arc::new(SessionRegistry::new(config.sessions.idle_timeout));
        Self {
            config: Arc::new(config),
            theme,
            sessions,
        }
    }
}
