//! Chain execution.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use tracing::debug;

use crate::error::{SamlError, SamlResult};
use crate::types::ProtocolMessage;

use super::{Handler, HandlerChain, HandlerRequest, HandlerResponse};

/// Runs a [`HandlerChain`] under an optional caller-supplied lock.
///
/// Every traversal stops at the first handler that leaves the response in
/// error. The lock is a scoped guard, so it is released on every exit path.
#[derive(Debug, Clone)]
pub struct HandlerChainProcessor {
    chain: HandlerChain,
    lock: Arc<Mutex<()>>,
    use_locking: bool,
}

impl HandlerChainProcessor {
    /// Creates a processor over `chain`.
    #[must_use]
    pub const fn new(chain: HandlerChain, lock: Arc<Mutex<()>>, use_locking: bool) -> Self {
        Self {
            chain,
            lock,
            use_locking,
        }
    }

    /// Returns the chain.
    #[must_use]
    pub const fn chain(&self) -> &HandlerChain {
        &self.chain
    }

    fn guard(&self) -> Option<MutexGuard<'_, ()>> {
        self.use_locking.then(|| self.lock.lock())
    }

    /// Runs the outbound flow: every handler is reset, then asked to
    /// contribute to the outgoing document.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Processing`] if a handler fails.
    pub fn generate(&self, request: &HandlerRequest, response: &mut HandlerResponse) -> SamlResult<()> {
        let _guard = self.guard();

        for handler in self.chain.iter() {
            handler.reset();
        }
        self.run(response, |handler, response| {
            handler.generate_request(request, response)
        })
    }

    /// Runs the inbound flow for `request.message`.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::InvalidRequest`] if the request carries no
    /// message and [`SamlError::Processing`] if a handler fails.
    pub fn process(&self, request: &HandlerRequest, response: &mut HandlerResponse) -> SamlResult<()> {
        let message = request
            .message
            .as_ref()
            .ok_or_else(|| SamlError::InvalidRequest("no inbound message".to_string()))?;

        let _guard = self.guard();

        match message {
            ProtocolMessage::Request(m) => self.run(response, |handler, response| {
                handler.handle_request(m, request, response)
            }),
            ProtocolMessage::Response(m) => self.run(response, |handler, response| {
                handler.handle_response(m, request, response)
            }),
        }
    }

    fn run<F>(&self, response: &mut HandlerResponse, mut dispatch: F) -> SamlResult<()>
    where
        F: FnMut(&dyn Handler, &mut HandlerResponse) -> SamlResult<()>,
    {
        for handler in self.chain.iter() {
            if response.is_in_error() {
                debug!(
                    handler = handler.name(),
                    status = response.error_code(),
                    "chain stopped by earlier handler"
                );
                break;
            }
            debug!(handler = handler.name(), "dispatching handler");
            dispatch(handler.as_ref(), response).map_err(|e| match e {
                SamlError::SignatureInvalid(_) | SamlError::Processing(_) => e,
                other => SamlError::Processing(format!("{}: {other}", handler.name())),
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use fl_core::config::ServiceProviderConfig;

    use super::*;
    use crate::session::SpSession;
    use crate::types::{LogoutResponse, RequestMessage, ResponseMessage};

    #[derive(Default)]
    struct Recorder {
        name: &'static str,
        fail_with: Option<u16>,
        error: bool,
        resets: AtomicUsize,
        generated: AtomicUsize,
        requests: AtomicUsize,
        responses: AtomicUsize,
    }

    impl Recorder {
        fn new(name: &'static str) -> Self {
            Self {
                name,
                ..Self::default()
            }
        }
    }

    impl Handler for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        fn reset(&self) {
            self.resets.fetch_add(1, Ordering::SeqCst);
        }

        fn generate_request(&self, _: &HandlerRequest, response: &mut HandlerResponse) -> SamlResult<()> {
            self.generated.fetch_add(1, Ordering::SeqCst);
            if let Some(code) = self.fail_with {
                response.set_error(code, "handler failed");
            }
            Ok(())
        }

        fn handle_request(
            &self,
            _: &RequestMessage,
            _: &HandlerRequest,
            _: &mut HandlerResponse,
        ) -> SamlResult<()> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn handle_response(
            &self,
            _: &ResponseMessage,
            _: &HandlerRequest,
            response: &mut HandlerResponse,
        ) -> SamlResult<()> {
            self.responses.fetch_add(1, Ordering::SeqCst);
            if self.error {
                return Err(SamlError::Internal("boom".to_string()));
            }
            if let Some(code) = self.fail_with {
                response.set_error(code, "handler failed");
            }
            Ok(())
        }
    }

    fn request(message: Option<ProtocolMessage>) -> HandlerRequest {
        let request = HandlerRequest::new(
            Arc::new(ServiceProviderConfig::default()),
            Arc::new(SpSession::new()),
        );
        match message {
            Some(m) => request.with_message(m),
            None => request,
        }
    }

    fn processor(handlers: &[Arc<Recorder>]) -> (HandlerChainProcessor, Arc<Mutex<()>>) {
        let chain = handlers
            .iter()
            .map(|h| Arc::clone(h) as Arc<dyn Handler>)
            .collect();
        let lock = Arc::new(Mutex::new(()));
        (HandlerChainProcessor::new(chain, Arc::clone(&lock), true), lock)
    }

    #[test]
    fn first_error_short_circuits_the_chain() {
        let a = Arc::new(Recorder {
            fail_with: Some(403),
            ..Recorder::new("a")
        });
        let b = Arc::new(Recorder::new("b"));
        let c = Arc::new(Recorder::new("c"));
        let (processor, lock) = processor(&[a.clone(), b.clone(), c.clone()]);

        let mut response = HandlerResponse::new();
        let message = LogoutResponse::success("idp").into();
        processor.process(&request(Some(message)), &mut response).unwrap();

        assert_eq!(response.error_code(), Some(403));
        assert_eq!(a.responses.load(Ordering::SeqCst), 1);
        assert_eq!(b.responses.load(Ordering::SeqCst), 0);
        assert_eq!(c.responses.load(Ordering::SeqCst), 0);
        assert!(lock.try_lock().is_some());
    }

    #[test]
    fn messages_are_dispatched_by_shape() {
        let a = Arc::new(Recorder::new("a"));
        let (processor, _) = processor(&[a.clone()]);

        let request_message = crate::types::LogoutRequest::new("idp", "alice").into();
        processor
            .process(&request(Some(request_message)), &mut HandlerResponse::new())
            .unwrap();
        assert_eq!(a.requests.load(Ordering::SeqCst), 1);
        assert_eq!(a.responses.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn generate_resets_every_handler_first() {
        let a = Arc::new(Recorder {
            fail_with: Some(500),
            ..Recorder::new("a")
        });
        let b = Arc::new(Recorder::new("b"));
        let (processor, _) = processor(&[a.clone(), b.clone()]);

        let mut response = HandlerResponse::new();
        processor.generate(&request(None), &mut response).unwrap();

        assert_eq!(a.resets.load(Ordering::SeqCst), 1);
        assert_eq!(b.resets.load(Ordering::SeqCst), 1);
        assert_eq!(b.generated.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn process_never_resets() {
        let a = Arc::new(Recorder::new("a"));
        let (processor, _) = processor(&[a.clone()]);

        let message = LogoutResponse::success("idp").into();
        processor
            .process(&request(Some(message)), &mut HandlerResponse::new())
            .unwrap();
        assert_eq!(a.resets.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn handler_failure_releases_the_lock() {
        let a = Arc::new(Recorder {
            error: true,
            ..Recorder::new("a")
        });
        let (processor, lock) = processor(&[a]);

        let message = LogoutResponse::success("idp").into();
        let err = processor
            .process(&request(Some(message)), &mut HandlerResponse::new())
            .unwrap_err();

        assert!(matches!(err, SamlError::Processing(msg) if msg.starts_with("a: ")));
        assert!(lock.try_lock().is_some());
    }

    #[test]
    fn lock_is_held_while_handlers_run() {
        struct Observer(Arc<Mutex<()>>);

        impl Handler for Observer {
            fn name(&self) -> &str {
                "observer"
            }

            fn generate_request(&self, _: &HandlerRequest, response: &mut HandlerResponse) -> SamlResult<()> {
                if self.0.try_lock().is_none() {
                    response.set_error(423, "locked");
                }
                Ok(())
            }
        }

        let lock = Arc::new(Mutex::new(()));
        let chain = HandlerChain::new().with(Arc::new(Observer(Arc::clone(&lock))));

        let mut response = HandlerResponse::new();
        HandlerChainProcessor::new(chain.clone(), Arc::clone(&lock), true)
            .generate(&request(None), &mut response)
            .unwrap();
        assert_eq!(response.error_code(), Some(423));

        let mut response = HandlerResponse::new();
        HandlerChainProcessor::new(chain, lock, false)
            .generate(&request(None), &mut response)
            .unwrap();
        assert!(!response.is_in_error());
    }

    #[test]
    fn missing_message_is_rejected() {
        let (processor, _) = processor(&[]);
        assert!(matches!(
            processor.process(&request(None), &mut HandlerResponse::new()),
            Err(SamlError::InvalidRequest(_))
        ));
    }
}
