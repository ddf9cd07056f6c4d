//! Per-browser session state.
//!
//! Each browser carries an opaque UUID in the `lab_session` cookie; the
//! extracted results live only in this in-memory map. Entries idle for
//! longer than the TTL are purged on the next access.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use axum::http::header::COOKIE;
use axum::http::HeaderMap;
use uuid::Uuid;

use crate::models::LabResult;

pub const SESSION_COOKIE: &str = "lab_session";

// ═══════════════════════════════════════════════════════════
// SessionStore
// ═══════════════════════════════════════════════════════════

struct SessionEntry {
    results: Vec<LabResult>,
    last_access: Instant,
}

pub struct SessionStore {
    ttl: Duration,
    sessions: HashMap<Uuid, SessionEntry>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: HashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Results for `id`, refreshing its idle timer. Expired entries are dropped.
    pub fn get(&mut self, id: &Uuid) -> Option<Vec<LabResult>> {
        self.purge_expired();
        let entry = self.sessions.get_mut(id)?;
        entry.last_access = Instant::now();
        Some(entry.results.clone())
    }

    /// Replace the results for `id`.
    pub fn insert(&mut self, id: Uuid, results: Vec<LabResult>) {
        self.purge_expired();
        self.sessions.insert(
            id,
            SessionEntry {
                results,
                last_access: Instant::now(),
            },
        );
    }

    /// Returns true if a session was removed.
    pub fn remove(&mut self, id: &Uuid) -> bool {
        self.sessions.remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop entries idle longer than the TTL. Returns how many were removed.
    pub fn purge_expired(&mut self) -> usize {
        let before = self.sessions.len();
        let ttl = self.ttl;
        self.sessions
            .retain(|_, entry| entry.last_access.elapsed() <= ttl);
        let purged = before - self.sessions.len();
        if purged > 0 {
            tracing::debug!(purged, "Expired sessions removed");
        }
        purged
    }
}

// ═══════════════════════════════════════════════════════════
// Cookie helpers
// ═══════════════════════════════════════════════════════════

/// Session id from the request's `Cookie` header(s), if present and valid.
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}

/// `Set-Cookie` value binding the browser to `id`.
pub fn session_cookie(id: &Uuid, max_age: Duration) -> String {
    format!(
        "{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        max_age.as_secs()
    )
}

/// `Set-Cookie` value that deletes the session cookie.
pub fn expired_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}
