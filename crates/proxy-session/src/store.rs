//! In-memory session store.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;

use crate::auth_session::AuthSession;

/// How long a session stays usable.
pub const SESSION_TTL: Duration = Duration::from_secs(15 * 60);

/// How often [`session_cleanup_task`] sweeps the store.
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Concurrent session store keyed by session ID.
///
/// Cloning is cheap; clones share the same sessions.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<DashMap<String, AuthSession>>,
}

impl SessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session and returns its ID (a UUID v4).
    pub fn create(
        &self,
        original_request_id: impl Into<String>,
        sp_acs_url: impl Into<String>,
        sp_entity_id: impl Into<String>,
        relay_state: Option<String>,
    ) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let session = AuthSession::new(original_request_id, sp_acs_url, sp_entity_id, relay_state);
        self.inner.insert(id.clone(), session);
        id
    }

    /// Stores a session under an existing ID, replacing any previous one.
    pub fn insert(&self, id: impl Into<String>, session: AuthSession) {
        self.inner.insert(id.into(), session);
    }

    /// Returns a copy of a live session.
    ///
    /// An expired session is removed and reported as missing.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<AuthSession> {
        {
            let entry = self.inner.get(id)?;
            if !entry.is_expired(Utc::now(), SESSION_TTL) {
                return Some(entry.value().clone());
            }
        }

        self.inner.remove(id);
        tracing::debug!(session_id = id, "session expired");
        None
    }

    /// Records the university the user picked.
    pub fn update_university(&self, id: &str, entity_id: impl Into<String>) -> bool {
        self.update(id, |session| {
            session.selected_university = Some(entity_id.into());
        })
    }

    /// Records the ID of the AuthnRequest sent to the university.
    pub fn update_proxy_request_id(&self, id: &str, request_id: impl Into<String>) -> bool {
        self.update(id, |session| {
            session.proxy_request_id = Some(request_id.into());
        })
    }

    fn update(&self, id: &str, apply: impl FnOnce(&mut AuthSession)) -> bool {
        match self.inner.get_mut(id) {
            Some(mut entry) if !entry.is_expired(Utc::now(), SESSION_TTL) => {
                apply(entry.value_mut());
                true
            }
            _ => false,
        }
    }

    /// Removes a session, returning it if it was still live.
    pub fn remove(&self, id: &str) -> Option<AuthSession> {
        self.inner
            .remove(id)
            .map(|(_, session)| session)
            .filter(|session| !session.is_expired(Utc::now(), SESSION_TTL))
    }

    /// Drops every expired session and returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.inner.len();
        self.inner
            .retain(|_, session| !session.is_expired(now, SESSION_TTL));
        before.saturating_sub(self.inner.len())
    }

    /// Number of stored sessions, including expired ones not yet swept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns true if no sessions are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Sweeps expired sessions every [`CLEANUP_INTERVAL`].
pub async fn session_cleanup_task(store: SessionStore) {
    let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
    loop {
        interval.tick().await;
        let removed = store.cleanup_expired();
        if removed > 0 {
            tracing::info!(removed, remaining = store.len(), "cleaned up expired sessions");
        }
    }
}
