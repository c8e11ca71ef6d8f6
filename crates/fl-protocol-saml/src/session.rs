//! Per-browser session state shared with the handlers.

use parking_lot::Mutex;

/// What the handlers know about an authenticated principal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Authenticated principal.
    pub principal: Option<String>,
    /// Roles granted to the principal.
    pub roles: Vec<String>,
    /// IdP session index, echoed on logout.
    pub session_index: Option<String>,
}

/// Session owned by the transport and passed to each exchange.
#[derive(Debug, Default)]
pub struct SpSession {
    state: Mutex<SessionState>,
}

impl SpSession {
    /// Creates an unauthenticated session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful authentication.
    pub fn authenticate(
        &self,
        principal: impl Into<String>,
        roles: Vec<String>,
        session_index: Option<String>,
    ) {
        *self.state.lock() = SessionState {
            principal: Some(principal.into()),
            roles,
            session_index,
        };
    }

    /// Forgets the principal.
    pub fn clear(&self) {
        *self.state.lock() = SessionState::default();
    }

    /// Returns the authenticated principal.
    #[must_use]
    pub fn principal(&self) -> Option<String> {
        self.state.lock().principal.clone()
    }

    /// Returns true if a principal is authenticated.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.lock().principal.is_some()
    }

    /// Returns a copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.state.lock().clone()
    }
}
