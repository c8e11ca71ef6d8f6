//! Session-scoped nonces.
//!
//! A nonce is `base64("<millis>:<uuid>")`: the issue time in milliseconds
//! since the epoch and a random v4 UUID. Each session keeps the ordered list
//! of nonces it was given. Nonces are not consumed by [`NonceGuard::check`];
//! they age out.

use std::sync::Arc;

use base64::Engine;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{debug, warn};
use uuid::Uuid;

/// Result of checking a presented nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonceStatus {
    /// Issued to this session and within its maximum age.
    Valid,
    /// Issued to this session but older than the maximum age.
    Stale,
    /// Never issued to this session.
    Invalid,
}

/// Issues and checks per-session nonces.
#[derive(Debug, Default)]
pub struct NonceGuard {
    outstanding: DashMap<String, Vec<String>>,
}

impl NonceGuard {
    /// Creates an empty guard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty guard behind an `Arc`.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Issues a nonce to `session_id` stamped with the current time.
    pub fn issue(&self, session_id: &str) -> String {
        self.issue_at(session_id, Utc::now())
    }

    /// Issues a nonce to `session_id` stamped with `now`.
    pub fn issue_at(&self, session_id: &str, now: DateTime<Utc>) -> String {
        let raw = format!("{}:{}", now.timestamp_millis(), Uuid::new_v4());
        let nonce = base64::engine::general_purpose::STANDARD.encode(raw);

        self.outstanding
            .entry(session_id.to_string())
            .or_default()
            .push(nonce.clone());
        debug!(session_id, "nonce issued");
        nonce
    }

    /// Checks `nonce` for `session_id` against the current time.
    #[must_use]
    pub fn check(&self, session_id: &str, nonce: &str, max_age_millis: i64) -> NonceStatus {
        self.check_at(session_id, nonce, max_age_millis, Utc::now())
    }

    /// Checks `nonce` for `session_id` as of `now`.
    #[must_use]
    pub fn check_at(
        &self,
        session_id: &str,
        nonce: &str,
        max_age_millis: i64,
        now: DateTime<Utc>,
    ) -> NonceStatus {
        let known = self
            .outstanding
            .get(session_id)
            .is_some_and(|list| list.iter().any(|n| n == nonce));
        if !known {
            return NonceStatus::Invalid;
        }

        let Some(issued_millis) = issued_millis(nonce) else {
            return NonceStatus::Invalid;
        };

        if now.timestamp_millis().saturating_sub(issued_millis) > max_age_millis {
            warn!(session_id, "stale nonce presented");
            NonceStatus::Stale
        } else {
            NonceStatus::Valid
        }
    }

    /// Number of nonces outstanding for `session_id`.
    #[must_use]
    pub fn outstanding(&self, session_id: &str) -> usize {
        self.outstanding.get(session_id).map_or(0, |list| list.len())
    }

    /// Drops every nonce of `session_id`.
    pub fn forget(&self, session_id: &str) {
        self.outstanding.remove(session_id);
    }
}

fn issued_millis(nonce: &str) -> Option<i64> {
    let raw = base64::engine::general_purpose::STANDARD.decode(nonce).ok()?;
    let raw = String::from_utf8(raw).ok()?;
    raw.split_once(':')?.0.parse().ok()
}
