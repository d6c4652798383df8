use chrono::{DateTime, FixedOffset};

use crate::artifact::format_display_time;
use crate::id::CallerHash;
use crate::language::Language;

/// Who submitted an artifact, and when.
///
/// Rendered as a comment block at the top of every archived file.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Provenance {
    /// The client's self-reported identifier (the id seed).
    pub client_id: String,
    /// Salted hash of the caller's network address.
    pub caller_hash: CallerHash,
    /// When the submission was captured.
    pub captured_at: DateTime<FixedOffset>,
}

impl Provenance {
    /// Create a provenance record.
    #[must_use]
    pub fn new(client_id: &str, caller_hash: CallerHash, captured_at: DateTime<FixedOffset>) -> Self {
        Self { client_id: client_id.to_owned(), caller_hash, captured_at }
    }

    /// Render the header block, terminated by a blank line.
    ///
    /// Line breaks in the client identifier are flattened so the header
    /// always spans exactly three lines.
    #[must_use]
    pub fn header(&self, language: Language) -> String {
        let prefix = language.comment_prefix();
        let client_id: String = self
            .client_id
            .chars()
            .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
            .collect();
        format!(
            "{prefix} ClientID: {client_id}\n{prefix} IPHash: {}\n{prefix} Start: {}\n\n",
            self.caller_hash,
            format_display_time(&self.captured_at),
        )
    }
}
