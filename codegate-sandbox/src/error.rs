//! Error types for the sandbox client.

/// Errors that can occur while talking to the sandbox service.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SandboxError {
    /// The configured base URL cannot be used.
    #[error("invalid sandbox URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The sandbox could not be reached, or did not answer in time.
    #[error("Sandbox service unavailable: {0}")]
    Unavailable(String),

    /// The sandbox answered with a body that is not a valid result.
    #[error("Failed to parse sandbox response: {reason}, body: {body}")]
    Protocol { reason: String, body: String },
}
