//! Submission archive for the codegate gateway.
//!
//! [`Archive`] appends one artifact per submission under a collision-free
//! name; [`ArtifactStore`] lists, reads and deletes them for the admin
//! surface.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

mod allocator;
mod error;
mod store;

pub use allocator::{Archive, Submission};
pub use error::ArchiveError;
pub use store::{ArtifactEntry, ArtifactStore};
