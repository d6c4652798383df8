//! Error types for the archive crate.

use std::path::PathBuf;

use codegate_core::ShortId;

/// Errors that can occur while archiving or administering artifacts.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ArchiveError {
    /// The archive directory could not be created.
    #[error("cannot create archive directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The archive directory could not be listed.
    #[error("cannot read archive directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Another writer already created an artifact with this name.
    #[error("artifact {name} already exists")]
    Collision { name: String },

    /// Every four-digit sequence number for this identifier is taken.
    #[error("sequence numbers exhausted for id {id}")]
    SequenceExhausted { id: ShortId },

    /// The artifact could not be written.
    #[error("cannot write artifact {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The requested name is not a bare file name.
    #[error("invalid filename")]
    InvalidName { name: String },

    /// No artifact with this name exists.
    #[error("file not found")]
    NotFound { name: String },

    /// Underlying I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
