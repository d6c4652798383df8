//! Sandbox backend abstraction trait.
//!
//! Lets the gateway run against the HTTP sandbox in production and an
//! in-process fake in tests.

use async_trait::async_trait;

use crate::{SandboxError, SandboxOutcome};

/// An isolated code execution service.
///
/// Implementations must be `Send + Sync` to allow use across async tasks.
#[async_trait]
pub trait SandboxBackend: Send + Sync {
    /// Run `code` and return the sandbox's verdict.
    ///
    /// # Errors
    /// Returns [`SandboxError::Unavailable`] if the service cannot be reached
    /// in time, or [`SandboxError::Protocol`] if its answer is not a result.
    async fn execute(&self, code: &str) -> Result<SandboxOutcome, SandboxError>;

    /// Check that the service is up.
    ///
    /// # Errors
    /// Returns [`SandboxError::Unavailable`] if it is not.
    async fn health_check(&self) -> Result<(), SandboxError>;
}
