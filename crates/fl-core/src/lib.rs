//! # fl-core
//!
//! Core configuration, error handling and the shared token model for ferrolink.
//!
//! Every other ferrolink crate depends on this one:
//!
//! - [`config`] - the TOML/env configuration tree
//! - [`error`] - the top-level error taxonomy
//! - [`token`] - security tokens and qualified element names

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod token;

pub use config::Config;
pub use error::{Error, Result};
pub use token::{QName, Token};
