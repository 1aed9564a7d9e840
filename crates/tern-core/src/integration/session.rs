//! Session records and the persistence collaborator.

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::foundation::SessionResult;

/// An authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Token sent with every call.
    pub access_token: String,
    /// Account the token belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    /// Expiry as seconds since the Unix epoch; `None` never expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
}

impl Session {
    /// Creates a non-expiring session.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            user_id: None,
            expires_at: None,
        }
    }

    /// Sets the owning account.
    pub fn with_user_id(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Sets the expiry time.
    pub fn with_expires_at(mut self, expires_at: u64) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Returns `true` if the session expired before `now` (Unix seconds).
    pub fn is_expired_at(&self, now: u64) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Returns `true` if the session has expired.
    pub fn is_expired(&self) -> bool {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        self.is_expired_at(now)
    }
}

/// Durable storage for a single [`Session`].
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Loads the stored session, or `None` if there is none.
    async fn load(&self) -> SessionResult<Option<Session>>;

    /// Replaces the stored session.
    async fn store(&self, session: &Session) -> SessionResult<()>;

    /// Removes the stored session.
    async fn clear(&self) -> SessionResult<()>;
}

/// [`SessionStore`] that keeps the session in memory.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: Mutex<Option<Session>>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> SessionResult<Option<Session>> {
        Ok(self.session.lock().clone())
    }

    async fn store(&self, session: &Session) -> SessionResult<()> {
        *self.session.lock() = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> SessionResult<()> {
        self.session.lock().take();
        Ok(())
    }
}
