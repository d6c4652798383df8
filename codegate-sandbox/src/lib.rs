//! Client side of the external code execution sandbox.
//!
//! The sandbox is an opaque HTTP service: it receives `{code, timeout}` and
//! answers `{success, output, error}`. This crate owns the wire types, the
//! [`SandboxBackend`] seam and its HTTP implementation.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

mod backend;
mod error;
mod http_client;
mod protocol;

pub use backend::SandboxBackend;
pub use error::SandboxError;
pub use http_client::{HttpSandbox, DEFAULT_REQUEST_TIMEOUT};
pub use protocol::{ExecuteRequest, OutputLine, SandboxOutcome, EXECUTION_TIMEOUT_MS};
