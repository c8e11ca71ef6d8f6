//! End-to-end integration tests.
//!
//! Each test spawns a ferrolink server on an ephemeral port and drives it
//! over HTTP with `reqwest`.

mod common;
mod digest;
mod sp;
mod sts;
