//! SP endpoint state.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tracing::debug;

use crate::session::SpSession;
use crate::sp::ServiceProviderProcessor;

#[derive(Debug)]
struct SessionEntry {
    session: Arc<SpSession>,
    last_seen: DateTime<Utc>,
}

/// Shared state of the SP endpoints.
#[derive(Debug, Clone)]
pub struct SpState {
    /// The SP engine.
    pub processor: Arc<ServiceProviderProcessor>,
    sessions: Arc<DashMap<String, SessionEntry>>,
}

impl SpState {
    /// Creates endpoint state around `processor` with an empty session store.
    #[must_use]
    pub fn new(processor: Arc<ServiceProviderProcessor>) -> Self {
        Self {
            processor,
            sessions: Arc::new(DashMap::new()),
        }
    }

    /// Returns the session for `id`, creating one if `id` is absent or
    /// unknown. The second value is true when a session was created and its
    /// ID must be sent back to the browser. Every lookup counts as activity.
    pub fn session(&self, id: Option<&str>) -> (String, Arc<SpSession>, bool) {
        self.session_at(id, Utc::now())
    }

    fn session_at(&self, id: Option<&str>, now: DateTime<Utc>) -> (String, Arc<SpSession>, bool) {
        if let Some(id) = id {
            if let Some(mut entry) = self.sessions.get_mut(id) {
                entry.last_seen = now;
                return (id.to_string(), Arc::clone(&entry.session), false);
            }
        }

        let id = fl_crypto::generate_session_id();
        let session = Arc::new(SpSession::new());
        self.sessions.insert(
            id.clone(),
            SessionEntry {
                session: Arc::clone(&session),
                last_seen: now,
            },
        );
        debug!(sessions = self.sessions.len(), "created SP session");
        (id, session, true)
    }

    /// Drops sessions not used for longer than `max_idle`, authenticated or
    /// not. Returns how many were dropped.
    pub fn prune(&self, max_idle: Duration) -> usize {
        self.prune_at(Utc::now(), max_idle)
    }

    fn prune_at(&self, now: DateTime<Utc>, max_idle: Duration) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, entry| now.signed_duration_since(entry.last_seen) <= max_idle);
        let dropped = before.saturating_sub(self.sessions.len());
        if dropped > 0 {
            debug!(dropped, sessions = self.sessions.len(), "pruned idle SP sessions");
        }
        dropped
    }

    /// Returns the number of live sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use fl_core::config::ServiceProviderConfig;

    use super::*;

    fn state() -> SpState {
        let config = ServiceProviderConfig {
            identity_url: "https://idp.example.com/sso".to_string(),
            ..ServiceProviderConfig::default()
        };
        let processor = ServiceProviderProcessor::from_config(config).unwrap();
        SpState::new(Arc::new(processor))
    }

    #[test]
    fn idle_sessions_are_dropped_and_active_ones_kept() {
        let state = state();
        let start = Utc::now();
        let idle = Duration::minutes(30);

        let (stale_id, stale, _) = state.session_at(None, start);
        stale.authenticate("alice", Vec::new(), None);
        let (active_id, _, _) = state.session_at(None, start);

        let (_, _, created) = state.session_at(Some(&active_id), start + Duration::minutes(20));
        assert!(!created);

        assert_eq!(state.prune_at(start + Duration::minutes(31), idle), 1);
        assert_eq!(state.session_count(), 1);

        let (_, _, created) = state.session_at(Some(&stale_id), start + Duration::minutes(31));
        assert!(created);
        let (_, _, created) = state.session_at(Some(&active_id), start + Duration::minutes(31));
        assert!(!created);
    }
}
