//! Response replay detection.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::SamlResult;
use crate::handler::{Handler, HandlerRequest, HandlerResponse};
use crate::types::ResponseMessage;
use crate::validator;

#[derive(Debug, Default)]
struct Seen {
    expiries: HashMap<String, DateTime<Utc>>,
    queue: BinaryHeap<Reverse<(DateTime<Utc>, String)>>,
}

impl Seen {
    fn forget_expired(&mut self, now: DateTime<Utc>) {
        while let Some(Reverse((expiry, _))) = self.queue.peek() {
            if *expiry > now {
                break;
            }
            if let Some(Reverse((expiry, id))) = self.queue.pop() {
                if self.expiries.get(&id) == Some(&expiry) {
                    self.expiries.remove(&id);
                }
            }
        }
    }

    /// Records `id` until `expiry`. Returns false if it is already recorded.
    fn insert(&mut self, id: &str, expiry: DateTime<Utc>) -> bool {
        if self.expiries.contains_key(id) {
            return false;
        }
        self.expiries.insert(id.to_string(), expiry);
        self.queue.push(Reverse((expiry, id.to_string())));
        true
    }
}

/// Rejects any response whose ID has been processed before.
///
/// An ID is remembered until the latest `NotOnOrAfter` of its assertions
/// plus the clock skew, after which the assertion check rejects the
/// response anyway. Responses without a window are remembered for
/// `replay_retention_secs`. Seen IDs survive [`Handler::reset`]; they are
/// process-local and are lost on restart.
#[derive(Debug, Default)]
pub struct ReplayGuardHandler {
    seen: Mutex<Seen>,
}

impl ReplayGuardHandler {
    /// Registered name.
    pub const NAME: &'static str = "replay_guard";

    /// Creates a guard that has seen nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of response IDs currently remembered.
    #[must_use]
    pub fn seen(&self) -> usize {
        self.seen.lock().expiries.len()
    }

    fn check_at(
        &self,
        message: &ResponseMessage,
        request: &HandlerRequest,
        response: &mut HandlerResponse,
        now: DateTime<Utc>,
    ) {
        let expiry = remember_until(message, request, now);
        let mut seen = self.seen.lock();
        seen.forget_expired(now);

        if seen.insert(message.id(), expiry) {
            debug!(response_id = message.id(), %expiry, remembered = seen.expiries.len(), "response recorded");
        } else {
            warn!(response_id = message.id(), "replayed response rejected");
            response.set_error(403, format!("response {} was already processed", message.id()));
        }
    }
}

fn remember_until(
    message: &ResponseMessage,
    request: &HandlerRequest,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    let window_end = match message {
        ResponseMessage::Response(r) => r
            .assertions
            .iter()
            .filter_map(|a| a.conditions.as_ref().and_then(validator::expires_at))
            .max(),
        ResponseMessage::LogoutResponse(_) => None,
    };

    match window_end {
        Some(end) => validator::add(end, request.config.clock_skew_millis),
        None => i64::try_from(request.config.replay_retention_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|retention| now.checked_add_signed(retention))
            .unwrap_or(DateTime::<Utc>::MAX_UTC),
    }
}

impl Handler for ReplayGuardHandler {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn handle_response(
        &self,
        message: &ResponseMessage,
        request: &HandlerRequest,
        response: &mut HandlerResponse,
    ) -> SamlResult<()> {
        self.check_at(message, request, response, Utc::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::handlers::test_request;
    use crate::types::{Assertion, Conditions, LogoutResponse, Response};

    use super::*;

    #[test]
    fn second_delivery_is_rejected() {
        let guard = ReplayGuardHandler::new();
        let message = ResponseMessage::LogoutResponse(LogoutResponse::success("idp"));

        let mut first = HandlerResponse::new();
        guard.handle_response(&message, &test_request(), &mut first).unwrap();
        assert!(!first.is_in_error());

        guard.reset();

        let mut second = HandlerResponse::new();
        guard.handle_response(&message, &test_request(), &mut second).unwrap();
        assert_eq!(second.error_code(), Some(403));
        assert_eq!(guard.seen(), 1);
    }

    #[test]
    fn ids_are_forgotten_once_their_window_closes() {
        let guard = ReplayGuardHandler::new();
        let request = test_request();
        let now = Utc::now();

        let mut assertion = Assertion::new("_a", "idp");
        assertion.conditions = Some(Conditions::new(
            now - Duration::minutes(1),
            now + Duration::minutes(5),
        ));
        let windowed = ResponseMessage::Response(Response::success("idp").with_assertion(assertion));
        let open = ResponseMessage::LogoutResponse(LogoutResponse::success("idp"));

        for message in [&windowed, &open] {
            let mut response = HandlerResponse::new();
            guard.check_at(message, &request, &mut response, now);
            assert!(!response.is_in_error());
        }
        assert_eq!(guard.seen(), 2);

        // Still inside the assertion window: a replay is caught
        let mut replay = HandlerResponse::new();
        guard.check_at(&windowed, &request, &mut replay, now + Duration::minutes(4));
        assert_eq!(replay.error_code(), Some(403));

        // The assertion window closed; the logout response is still held
        let mut response = HandlerResponse::new();
        guard.check_at(&open, &request, &mut response, now + Duration::minutes(6));
        assert_eq!(response.error_code(), Some(403));
        assert_eq!(guard.seen(), 1);

        // Past the retention period nothing is held
        let later = now + Duration::seconds(3601);
        let fresh = ResponseMessage::LogoutResponse(LogoutResponse::success("idp"));
        let mut response = HandlerResponse::new();
        guard.check_at(&fresh, &request, &mut response, later);
        assert!(!response.is_in_error());
        assert_eq!(guard.seen(), 1);
    }
}
