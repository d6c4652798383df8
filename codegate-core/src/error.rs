/// Errors produced by the `codegate-core` crate.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CoreError {
    /// A string was not a valid derived short identifier.
    #[error("invalid short id '{value}': {reason}")]
    InvalidShortId { value: String, reason: &'static str },

    /// A file name was not a bare name inside the artifact directory.
    #[error("invalid filename '{name}'")]
    InvalidFilename { name: String },
}
