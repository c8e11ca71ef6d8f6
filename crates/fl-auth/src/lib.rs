//! # fl-auth
//!
//! Replay-protected nonce challenges and HTTP digest authentication.
//!
//! - [`NonceGuard`] issues per-session nonces and judges them valid, stale
//!   or invalid
//! - [`DigestAuthenticator`] turns an `Authorization` header into either an
//!   authenticated username or a `WWW-Authenticate` challenge
//! - [`CredentialValidator`] is the seam to the identity store
//!
//! ## Example
//!
//! ```ignore
//! use fl_auth::{DigestAuthenticator, DigestOutcome, NonceGuard};
//!
//! let auth = DigestAuthenticator::new(NonceGuard::shared(), validator, &config.digest);
//! match auth.authenticate(&session_id, header, "POST").await? {
//!     DigestOutcome::Authenticated(user) => { /* proceed */ }
//!     DigestOutcome::Challenge(challenge) => { /* 401 + challenge.to_string() */ }
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod digest;
pub mod error;
pub mod nonce;
pub mod validator;

pub use digest::{DigestAuthenticator, DigestChallenge, DigestCredentials, DigestOutcome};
pub use error::{AuthError, AuthResult};
pub use nonce::{NonceGuard, NonceStatus};
pub use fl_core::config::DigestAlgorithm;
pub use validator::{CredentialValidator, PasswordDigestValidator};
