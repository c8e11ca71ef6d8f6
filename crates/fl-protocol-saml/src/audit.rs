//! Audit events.

use tracing::info;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditKind {
    /// An outbound request document was created.
    RequestCreated,
    /// An outbound response document was created.
    ResponseCreated,
    /// An inbound message passed decoding and verification.
    MessageReceived,
    /// A principal was authenticated.
    Authenticated,
    /// A session was logged out.
    LoggedOut,
    /// An inbound signature was rejected.
    SignatureRejected,
}

/// A single audit record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    /// Event kind.
    pub kind: AuditKind,
    /// Protocol message ID, when one is involved.
    pub message_id: Option<String>,
    /// Destination or principal the event concerns.
    pub destination: Option<String>,
}

impl AuditEvent {
    /// Creates an event.
    #[must_use]
    pub fn new(kind: AuditKind) -> Self {
        Self {
            kind,
            message_id: None,
            destination: None,
        }
    }

    /// Sets the message ID.
    #[must_use]
    pub fn with_message_id(mut self, id: impl Into<String>) -> Self {
        self.message_id = Some(id.into());
        self
    }

    /// Sets the destination.
    #[must_use]
    pub fn with_destination(mut self, destination: Option<&str>) -> Self {
        self.destination = destination.map(String::from);
        self
    }
}

/// Receives audit events.
pub trait AuditHook: Send + Sync {
    /// Records `event`.
    fn audit(&self, event: AuditEvent);
}

/// Writes audit events to the `audit` tracing target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditHook;

impl AuditHook for TracingAuditHook {
    fn audit(&self, event: AuditEvent) {
        info!(
            target: "audit",
            kind = ?event.kind,
            message_id = event.message_id.as_deref().unwrap_or("-"),
            destination = event.destination.as_deref().unwrap_or("-"),
            "saml audit event"
        );
    }
}
