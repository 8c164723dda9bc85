//! # proxy-session
//!
//! Authentication sessions for the discovery proxy.
//!
//! A session carries an SP's AuthnRequest across the discovery page and the
//! round trip to the chosen university. Sessions live in memory and expire
//! after fifteen minutes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod auth_session;
mod store;

pub use auth_session::AuthSession;
pub use store::{session_cleanup_task, SessionStore, CLEANUP_INTERVAL, SESSION_TTL};
