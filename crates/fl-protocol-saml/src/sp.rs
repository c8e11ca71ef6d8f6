//! Service-provider processing.
//!
//! [`ServiceProviderProcessor`] is the transport-independent core of the SP
//! endpoint: it decodes inbound binding parameters, verifies signatures,
//! runs the handler chain and encodes whatever document the chain produced
//! for the configured binding.

use std::sync::Arc;

use fl_core::config::{Binding, ServiceProviderConfig};
use fl_crypto::Verifier;
use parking_lot::Mutex;
use tracing::{debug, instrument, warn};

use crate::audit::{AuditEvent, AuditHook, AuditKind, TracingAuditHook};
use crate::bindings::{BindingCodec, DecodedMessage, SamlMessageType, SamlParams, Transmission};
use crate::error::{SamlError, SamlResult};
use crate::handler::{HandlerChain, HandlerChainProcessor, HandlerRequest, HandlerResponse, RequestKind};
use crate::handlers::chain_from_names;
use crate::session::SpSession;
use crate::signature::{
    resolve_validating_alias, verify_redirect, DocumentVerifier, EnvelopedSignature, KeyProvider,
    StaticKeyProvider,
};
use crate::types::{ProtocolMessage, RequestMessage};

/// What the transport should do after an exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpOutcome {
    /// Serve an auto-submitting form.
    PostForm(String),
    /// Redirect the browser.
    Redirect(String),
    /// A handler refused the exchange.
    Error {
        /// HTTP status chosen by the handler.
        status: u16,
        /// Description of the failure.
        message: String,
    },
    /// Nothing to send; the exchange completed locally.
    Done,
}

/// Service-provider side of browser SSO and single logout.
pub struct ServiceProviderProcessor {
    config: Arc<ServiceProviderConfig>,
    processor: HandlerChainProcessor,
    codec: BindingCodec,
    keys: Arc<dyn KeyProvider>,
    verifier: Arc<dyn DocumentVerifier>,
    audit: Option<Arc<dyn AuditHook>>,
}

impl std::fmt::Debug for ServiceProviderProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceProviderProcessor")
            .field("service_url", &self.config.service_url)
            .field("binding", &self.codec.binding())
            .field("chain", self.processor.chain())
            .finish_non_exhaustive()
    }
}

impl ServiceProviderProcessor {
    /// Creates a processor with an explicit chain and key source.
    #[must_use]
    pub fn new(config: ServiceProviderConfig, chain: HandlerChain, keys: Arc<dyn KeyProvider>) -> Self {
        let processor =
            HandlerChainProcessor::new(chain, Arc::new(Mutex::new(())), config.use_locking);
        Self {
            codec: BindingCodec::new(config.binding),
            config: Arc::new(config),
            processor,
            keys,
            verifier: Arc::new(EnvelopedSignature),
            audit: Some(Arc::new(TracingAuditHook)),
        }
    }

    /// Creates a processor from configuration alone: the chain comes from
    /// `handlers` and keys are read from the configured files.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Configuration`] for unknown handlers or
    /// unreadable keys.
    pub fn from_config(config: ServiceProviderConfig) -> SamlResult<Self> {
        let chain = chain_from_names(&config.handlers)?;
        let keys = StaticKeyProvider::from_config(&config)?;
        Ok(Self::new(config, chain, Arc::new(keys)))
    }

    /// Serializes chain runs on `lock`, which may be shared with other
    /// processors.
    #[must_use]
    pub fn with_lock(mut self, lock: Arc<Mutex<()>>) -> Self {
        self.processor =
            HandlerChainProcessor::new(self.processor.chain().clone(), lock, self.config.use_locking);
        self
    }

    /// Replaces the enveloped-signature verifier.
    #[must_use]
    pub fn with_verifier(mut self, verifier: Arc<dyn DocumentVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    /// Replaces the audit hook; `None` disables auditing.
    #[must_use]
    pub fn with_audit(mut self, audit: Option<Arc<dyn AuditHook>>) -> Self {
        self.audit = audit;
        self
    }

    /// Returns the active configuration.
    #[must_use]
    pub fn config(&self) -> &ServiceProviderConfig {
        &self.config
    }

    /// Starts an exchange initiated by this party.
    ///
    /// Authentication requests go to the IdP URL, logout requests to the
    /// logout URL.
    ///
    /// # Errors
    ///
    /// Returns an error if a handler fails or encoding fails.
    #[instrument(skip(self, session))]
    pub fn originate(
        &self,
        kind: RequestKind,
        session: &Arc<SpSession>,
        relay_state: Option<String>,
    ) -> SamlResult<SpOutcome> {
        let destination = match kind {
            RequestKind::Authentication => self.config.identity_url.as_str(),
            RequestKind::Logout => self.config.logout_destination(),
        };

        let request = self
            .handler_request(session)
            .with_kind(kind)
            .with_relay_state(relay_state.clone());
        let mut response = HandlerResponse::new();
        response.destination = Some(destination.to_string());
        response.relay_state = relay_state;

        self.processor.generate(&request, &mut response)?;
        self.finish(&response)
    }

    /// Handles binding parameters received from the browser.
    ///
    /// `GLO=true` without a message starts a global logout. Otherwise the
    /// message is decoded, its signature checked when signatures are on,
    /// and the handler chain run over it.
    ///
    /// # Errors
    ///
    /// Returns a decoding or parse error for malformed input,
    /// [`SamlError::SignatureInvalid`] for a bad or missing signature, and
    /// [`SamlError::Processing`] if a handler fails.
    #[instrument(skip_all, fields(glo = params.is_global_logout()))]
    pub fn process_inbound(&self, params: &SamlParams, session: &Arc<SpSession>) -> SamlResult<SpOutcome> {
        let global_logout = params.is_global_logout();
        if !params.has_message() {
            if global_logout {
                return self.originate(RequestKind::Logout, session, params.relay_state.clone());
            }
            return Err(SamlError::InvalidRequest(
                "No SAMLRequest or SAMLResponse parameter".to_string(),
            ));
        }

        let decoded = self.codec.decode(params)?;
        let message = ProtocolMessage::parse(&decoded.xml)?;
        let expected_type = if message.is_request() {
            SamlMessageType::Request
        } else {
            SamlMessageType::Response
        };
        if decoded.message_type != expected_type {
            return Err(SamlError::InvalidRequest(format!(
                "{} parameter carries the wrong message type",
                decoded.message_type.form_param()
            )));
        }

        let verifying_key = if self.config.supports_signatures {
            Some(self.verify(&decoded, &message)?)
        } else {
            None
        };

        self.emit(
            AuditEvent::new(AuditKind::MessageReceived)
                .with_message_id(message.id())
                .with_destination(Some(message.issuer())),
        );
        debug!(message_id = message.id(), issuer = message.issuer(), "inbound message accepted");

        let logout_request = matches!(
            message,
            ProtocolMessage::Request(RequestMessage::LogoutRequest(_))
        );
        let destination = if global_logout || logout_request {
            self.config.logout_destination()
        } else {
            self.config.identity_url.as_str()
        };

        let mut request = self
            .handler_request(session)
            .with_message(message)
            .with_relay_state(decoded.relay_state.clone());
        request.verifying_key = verifying_key;

        let mut response = HandlerResponse::new();
        response.destination = Some(destination.to_string());
        response.relay_state = decoded.relay_state;

        self.processor.process(&request, &mut response)?;
        self.finish(&response)
    }

    fn handler_request(&self, session: &Arc<SpSession>) -> HandlerRequest {
        let mut request = HandlerRequest::new(Arc::clone(&self.config), Arc::clone(session))
            .with_audit(self.audit.clone());
        request.signing_key = self.keys.signing_key();
        if self.config.supports_signatures {
            request.decrypting_key = self.keys.decrypting_key();
        }
        request
    }

    fn verify(&self, decoded: &DecodedMessage, message: &ProtocolMessage) -> SamlResult<Arc<dyn Verifier>> {
        let alias = resolve_validating_alias(&self.config)?;
        let key = self.keys.validating_key(&alias).ok_or_else(|| {
            SamlError::Configuration(format!("no validating key under alias '{alias}'"))
        })?;

        let result = match self.codec.binding() {
            Binding::Redirect => verify_redirect(decoded, key.as_ref()),
            Binding::Post => self.verifier.verify(&decoded.xml, key.as_ref()),
        };

        match result {
            Ok(()) => Ok(key),
            Err(e) => {
                warn!(message_id = message.id(), error = %e, "inbound signature rejected");
                self.emit(AuditEvent::new(AuditKind::SignatureRejected).with_message_id(message.id()));
                Err(match e {
                    SamlError::SignatureInvalid(_) => e,
                    other => SamlError::SignatureInvalid(other.to_string()),
                })
            }
        }
    }

    fn finish(&self, response: &HandlerResponse) -> SamlResult<SpOutcome> {
        if let Some(status) = response.error_code() {
            return Ok(SpOutcome::Error {
                status,
                message: response.error_message().unwrap_or_default().to_string(),
            });
        }

        let Some(xml) = response.serialized_document() else {
            return Ok(SpOutcome::Done);
        };
        let destination = response
            .destination
            .as_deref()
            .ok_or_else(|| SamlError::Configuration("no destination for outbound document".to_string()))?;
        let message_type = if response.send_request {
            SamlMessageType::Request
        } else {
            SamlMessageType::Response
        };

        let sent = self.codec.encode(
            &xml,
            destination,
            response.relay_state.as_deref(),
            message_type,
            response.destination_query_string.as_deref(),
        )?;
        Ok(match sent {
            Transmission::PostForm(html) => SpOutcome::PostForm(html),
            Transmission::Redirect(url) => SpOutcome::Redirect(url),
        })
    }

    fn emit(&self, event: AuditEvent) {
        if let Some(hook) = &self.audit {
            hook.audit(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use base64::Engine;
    use chrono::Utc;
    use fl_crypto::{RsaSigner, SignatureAlgorithm, Signer};

    use super::*;
    use crate::bindings::{form_field, HttpPostBinding, HttpRedirectBinding};
    use crate::types::{Assertion, Conditions, LogoutRequest, Response};
    use crate::validator::{add, subtract};

    fn config(binding: Binding) -> ServiceProviderConfig {
        ServiceProviderConfig {
            identity_url: "https://idp.example.com/sso".to_string(),
            logout_url: Some("https://idp.example.com/slo".to_string()),
            binding,
            ..ServiceProviderConfig::default()
        }
    }

    fn processor(binding: Binding) -> ServiceProviderProcessor {
        ServiceProviderProcessor::from_config(config(binding)).unwrap()
    }

    fn post(xml: &str, response: bool) -> SamlParams {
        let encoded = base64::engine::general_purpose::STANDARD.encode(xml);
        if response {
            SamlParams {
                saml_response: Some(encoded),
                ..SamlParams::default()
            }
        } else {
            SamlParams {
                saml_request: Some(encoded),
                ..SamlParams::default()
            }
        }
    }

    fn login_response() -> Response {
        let now = Utc::now();
        Response::success("https://idp.example.com").with_assertion(
            Assertion::new(fl_crypto::generate_token_id(), "https://idp.example.com")
                .with_subject("alice")
                .with_role("manager")
                .with_conditions(Conditions::new(subtract(now, 60_000), add(now, 60_000))),
        )
    }

    #[test]
    fn login_posts_authn_request_to_idp() {
        let sp = processor(Binding::Post);
        let session = Arc::new(SpSession::new());

        let SpOutcome::PostForm(html) = sp
            .originate(RequestKind::Authentication, &session, Some("/app".to_string()))
            .unwrap()
        else {
            panic!("expected a form");
        };

        assert!(html.contains(r#"action="https://idp.example.com/sso""#));
        let decoded = HttpPostBinding::decode(form_field(&html, "SAMLRequest"), None, None).unwrap();
        assert!(decoded.xml.contains("AuthnRequest"));
        assert_eq!(form_field(&html, "RelayState"), Some("/app"));
    }

    #[test]
    fn global_logout_redirects_to_logout_url() {
        let sp = processor(Binding::Redirect);
        let session = Arc::new(SpSession::new());
        session.authenticate("alice", Vec::new(), None);

        let params = SamlParams {
            glo: Some("true".to_string()),
            ..SamlParams::default()
        };
        let SpOutcome::Redirect(url) = sp.process_inbound(&params, &session).unwrap() else {
            panic!("expected a redirect");
        };

        assert!(url.starts_with("https://idp.example.com/slo?SAMLRequest="));
        let decoded = HttpRedirectBinding::decode_url(&url).unwrap();
        assert!(decoded.xml.contains("<saml:NameID>alice</saml:NameID>"));
    }

    #[test]
    fn global_logout_without_principal_is_refused() {
        let sp = processor(Binding::Redirect);
        let params = SamlParams {
            glo: Some("true".to_string()),
            ..SamlParams::default()
        };
        assert!(matches!(
            sp.process_inbound(&params, &Arc::new(SpSession::new())).unwrap(),
            SpOutcome::Error { status: 403, .. }
        ));
    }

    #[test]
    fn response_authenticates_and_replay_is_refused() {
        let sp = processor(Binding::Post);
        let session = Arc::new(SpSession::new());
        let params = post(&login_response().to_xml(), true);

        assert_eq!(sp.process_inbound(&params, &session).unwrap(), SpOutcome::Done);
        assert_eq!(session.principal().as_deref(), Some("alice"));

        assert!(matches!(
            sp.process_inbound(&params, &session).unwrap(),
            SpOutcome::Error { status: 403, .. }
        ));
    }

    #[test]
    fn idp_logout_request_is_answered_at_logout_url() {
        let sp = processor(Binding::Post);
        let session = Arc::new(SpSession::new());
        session.authenticate("alice", Vec::new(), None);

        let logout = LogoutRequest::new("https://idp.example.com", "alice");
        let SpOutcome::PostForm(html) = sp.process_inbound(&post(&logout.to_xml(), false), &session).unwrap()
        else {
            panic!("expected a form");
        };

        assert!(!session.is_authenticated());
        assert!(html.contains(r#"action="https://idp.example.com/slo""#));
        let reply = HttpPostBinding::decode(None, form_field(&html, "SAMLResponse"), None).unwrap();
        assert!(reply.xml.contains(&format!(r#"InResponseTo="{}""#, logout.id)));
    }

    #[test]
    fn malformed_input_is_a_client_error() {
        let sp = processor(Binding::Post);
        let session = Arc::new(SpSession::new());

        let err = sp.process_inbound(&post("<Response", true), &session).unwrap_err();
        assert_eq!(err.http_status(), 400);

        let err = sp.process_inbound(&SamlParams::default(), &session).unwrap_err();
        assert_eq!(err.http_status(), 400);

        let swapped = post(&LogoutRequest::new("idp", "alice").to_xml(), true);
        assert!(matches!(
            sp.process_inbound(&swapped, &session),
            Err(SamlError::InvalidRequest(_))
        ));
    }

    #[test]
    fn signatures_are_required_when_enabled() {
        let idp = RsaSigner::generate(SignatureAlgorithm::RsaSha256).unwrap();
        let keys = StaticKeyProvider::new().with_validating_key("idp.example.com", Arc::new(idp.verifier()));
        let sp = ServiceProviderProcessor::new(
            ServiceProviderConfig {
                supports_signatures: true,
                handlers: vec!["authentication".to_string()],
                ..config(Binding::Post)
            },
            chain_from_names(&["authentication"]).unwrap(),
            Arc::new(keys),
        );
        let session = Arc::new(SpSession::new());

        let unsigned = login_response().to_xml();
        assert!(matches!(
            sp.process_inbound(&post(&unsigned, true), &session),
            Err(SamlError::SignatureInvalid(_))
        ));
        assert!(!session.is_authenticated());

        let signed = EnvelopedSignature::sign(&unsigned, &idp as &dyn Signer).unwrap();
        assert_eq!(sp.process_inbound(&post(&signed, true), &session).unwrap(), SpOutcome::Done);
        assert!(session.is_authenticated());
    }

    #[test]
    fn unknown_handler_fails_construction() {
        let config = ServiceProviderConfig {
            handlers: vec!["bogus".to_string()],
            ..config(Binding::Post)
        };
        assert!(matches!(
            ServiceProviderProcessor::from_config(config),
            Err(SamlError::Configuration(_))
        ));
    }
}
