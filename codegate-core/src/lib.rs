//! Core types for the codegate submission gateway.
//!
//! Defines the domain types shared by the archive, sandbox and gateway
//! crates: derived short identifiers, artifact names, provenance headers
//! and caller-address hashes.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod artifact;
pub mod error;
pub mod id;
pub mod language;
pub mod provenance;

pub use artifact::{display_offset, validate_bare_filename, ArtifactName, Sequence};
pub use error::CoreError;
pub use id::{CallerHash, ShortId, SHORT_ID_ALPHABET, SHORT_ID_LEN};
pub use language::Language;
pub use provenance::Provenance;
