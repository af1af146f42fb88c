//! Collaborators the resolver reads from and writes to.
//!
//! Sessions and cookies are per-request state and are accessed synchronously.
//! Persisted settings and uploaded files live behind I/O and are async.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Duration;
use serde_json::Value;
use uuid::Uuid;

use crate::cookies::OutgoingCookie;

/// Who the current request belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Identity {
    user_id: Option<Uuid>,
}

impl Identity {
    /// Caller without a signed-in user.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Signed-in caller.
    pub fn user(user_id: Uuid) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    /// User id of a signed-in caller.
    pub fn user_id(&self) -> Option<Uuid> {
        self.user_id
    }

    /// True for signed-in callers.
    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }
}

/// Ephemeral per-session key/value data. Keys are dot-namespaced.
pub trait SessionStore: Send + Sync {
    /// True when `key` is present, even with a `false` value.
    fn exists(&self, key: &str) -> bool;
    /// Value stored under `key`.
    fn get(&self, key: &str) -> Option<Value>;
    /// Stores `value` under `key`.
    fn set(&self, key: &str, value: Value);
    /// Removes `key`.
    fn forget(&self, key: &str);
}

/// Durable key/value persistence for user and company settings.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserSettingsStore: Send + Sync {
    /// Value of a fully scoped setting key.
    async fn get_setting(&self, key: &str) -> Result<Option<String>>;
    /// Creates or replaces a setting.
    async fn save_setting(&self, key: &str, value: &str) -> Result<()>;
    /// Removes a setting; absent keys are not an error.
    async fn delete_setting(&self, key: &str) -> Result<()>;
}

/// Incoming cookies plus a deferred outgoing set, flushed when the
/// response is finalized.
pub trait CookieJar: Send + Sync {
    /// Cookie sent with the request.
    fn incoming(&self, name: &str) -> Option<String>;
    /// Replaces any cookie queued earlier under the same name.
    fn queue(&self, cookie: OutgoingCookie);
}

/// Access level of an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Reachable through a plain URL.
    Public,
    /// Needs a signed, expiring URL.
    Private,
}

/// Turns stored upload references into URLs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileResolver: Send + Sync {
    /// `Ok(None)` when the reference no longer points at a file.
    async fn resolve_url(
        &self,
        reference: &str,
        visibility: Visibility,
        ttl: Duration,
    ) -> Result<Option<String>>;
}

/// Looks up localized strings. Unknown keys come back unchanged.
pub trait Translator: Send + Sync {
    /// Message for `key`, or `key` itself when unknown.
    fn translate(&self, key: &str) -> String;
}
