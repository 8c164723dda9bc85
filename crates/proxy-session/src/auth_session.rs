//! Authentication session model.
//!
//! State kept between the SP's AuthnRequest and the university's Response.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An authentication session.
///
/// ## Flow
///
/// 1. SP sends an AuthnRequest to the proxy → `AuthSession` created
/// 2. User picks a university → `selected_university` set
/// 3. Proxy sends its own AuthnRequest → `proxy_request_id` set
/// 4. University responds → `AuthSession` removed and the SP answered
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    /// RelayState sent by the SP, returned untouched.
    pub relay_state: Option<String>,
    /// ID of the SP's AuthnRequest.
    pub original_request_id: String,
    /// Where the SP wants the Response delivered.
    pub sp_acs_url: String,
    /// The SP's entity ID (the audience of the final assertion).
    pub sp_entity_id: String,
    /// Entity ID of the chosen university IdP.
    pub selected_university: Option<String>,
    /// ID of the AuthnRequest the proxy sent to the university.
    pub proxy_request_id: Option<String>,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
}

impl AuthSession {
    /// Creates a new session.
    #[must_use]
    pub fn new(
        original_request_id: impl Into<String>,
        sp_acs_url: impl Into<String>,
        sp_entity_id: impl Into<String>,
        relay_state: Option<String>,
    ) -> Self {
        Self {
            relay_state,
            original_request_id: original_request_id.into(),
            sp_acs_url: sp_acs_url.into(),
            sp_entity_id: sp_entity_id.into(),
            selected_university: None,
            proxy_request_id: None,
            created_at: Utc::now(),
        }
    }

    /// Returns the session age.
    #[must_use]
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.created_at
    }

    /// Checks if the session is older than `ttl`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.age(now).to_std().is_ok_and(|age| age > ttl)
    }
}
