//! Archived artifact naming.
//!
//! Artifact files are named `<id>-<seq>-<stamp>.<ext>` where `id` is the
//! submitter's [`ShortId`], `seq` is a four-digit lowercase hex sequence
//! number and `stamp` is the capture time as `MMDDhhmm` in the display
//! offset.

use std::fmt;

use chrono::{DateTime, FixedOffset, Offset, TimeZone, Utc};

use crate::error::CoreError;
use crate::id::ShortId;

/// Seconds east of UTC used for every human-facing timestamp (UTC+09:00).
pub const DISPLAY_OFFSET_SECS: i32 = 9 * 60 * 60;

const STAMP_LEN: usize = 8;
const SEQUENCE_LEN: usize = 4;

/// The fixed offset used for artifact stamps, provenance and listings.
#[must_use]
pub fn display_offset() -> FixedOffset {
    FixedOffset::east_opt(DISPLAY_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Convert an instant into the display offset.
#[must_use]
pub fn to_display_time<Tz: TimeZone>(at: &DateTime<Tz>) -> DateTime<FixedOffset> {
    at.with_timezone(&display_offset())
}

/// Format an instant as RFC 3339 with second precision in the display offset.
#[must_use]
pub fn format_display_time<Tz: TimeZone>(at: &DateTime<Tz>) -> String {
    to_display_time(at).format("%Y-%m-%dT%H:%M:%S%:z").to_string()
}

/// Per-identifier artifact sequence number, confined to four hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Sequence(u16);

impl Sequence {
    /// The first sequence number handed out for an identifier.
    pub const FIRST: Self = Self(0);

    /// Wrap a raw sequence value.
    #[must_use]
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    /// The sequence following `self`, or `None` once the four-digit range is
    /// exhausted.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn value(self) -> u16 {
        self.0
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}", self.0)
    }
}

/// Name of a single archived artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub struct ArtifactName {
    /// Namespace of the submitting client.
    pub id: ShortId,
    /// Allocation order within `id`.
    pub sequence: Sequence,
    /// Capture time as `MMDDhhmm`.
    pub stamp: String,
    /// File extension without the leading dot.
    pub extension: String,
}

impl ArtifactName {
    /// Build the name for an artifact captured at `captured_at`.
    #[must_use]
    pub fn new<Tz: TimeZone>(
        id: ShortId,
        sequence: Sequence,
        captured_at: &DateTime<Tz>,
        extension: &str,
    ) -> Self {
        let stamp = to_display_time(captured_at).format("%m%d%H%M").to_string();
        Self { id, sequence, stamp, extension: extension.to_owned() }
    }

    /// Parse a file name of the form `<id>-<4hex>-<8 digits>.<ext>`.
    ///
    /// Returns `None` for anything else, including names whose sequence
    /// field is not valid hex.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let (stem, extension) = name.rsplit_once('.')?;
        if extension.is_empty() || !extension.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return None;
        }

        let mut parts = stem.splitn(3, '-');
        let id = ShortId::parse(parts.next()?).ok()?;
        let sequence = parts.next()?;
        let stamp = parts.next()?;

        if sequence.len() != SEQUENCE_LEN || !sequence.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let sequence = u16::from_str_radix(sequence, 16).ok()?;

        if stamp.len() != STAMP_LEN || !stamp.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        Some(Self {
            id,
            sequence: Sequence(sequence),
            stamp: stamp.to_owned(),
            extension: extension.to_owned(),
        })
    }
}

impl fmt::Display for ArtifactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}.{}", self.id, self.sequence, self.stamp, self.extension)
    }
}

/// Check that `name` refers to an entry directly inside a flat directory.
///
/// # Errors
/// Returns [`CoreError::InvalidFilename`] if `name` is empty, `.` or `..`,
/// or contains a path separator or NUL byte.
pub fn validate_bare_filename(name: &str) -> Result<&str, CoreError> {
    let bare = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0']);
    if bare {
        Ok(name)
    } else {
        Err(CoreError::InvalidFilename { name: name.to_owned() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_id() -> ShortId {
        match ShortId::parse("aB3dE5gH") {
            Ok(id) => id,
            Err(e) => panic!("fixture id must parse: {e}"),
        }
    }

    fn captured() -> DateTime<Utc> {
        // 2026-03-04T22:09:00Z is 2026-03-05 07:09 at +09:00.
        match Utc.with_ymd_and_hms(2026, 3, 4, 22, 9, 0).single() {
            Some(t) => t,
            None => panic!("fixture time must be unambiguous"),
        }
    }

    #[test]
    fn artifact_name_formats_sequence_and_local_stamp() {
        let name = ArtifactName::new(sample_id(), Sequence::new(0x2a), &captured(), "js");
        assert_eq!(name.to_string(), "aB3dE5gH-002a-03050709.js");
    }

    #[test]
    fn artifact_name_parse_accepts_own_output() {
        let name = ArtifactName::new(sample_id(), Sequence::new(0xffff), &captured(), "py");
        let parsed = ArtifactName::parse(&name.to_string());
        assert_eq!(parsed, Some(name));
    }

    #[test]
    fn artifact_name_parse_accepts_uppercase_hex() {
        let parsed = ArtifactName::parse("aB3dE5gH-00AF-03050709.js");
        assert_eq!(parsed.map(|n| n.sequence), Some(Sequence::new(0xaf)));
    }

    #[test]
    fn artifact_name_parse_rejects_malformed() {
        for bad in [
            "aB3dE5gH-00zz-03050709.js",
            "aB3dE5gH-002a-0305070.js",
            "aB3dE5gH-002a-03050709",
            "aB3dE5gH-02a-03050709.js",
            "short-002a-03050709.js",
            "aB3dE5gH-002a-03050709.",
            "notes.txt",
        ] {
            assert!(ArtifactName::parse(bad).is_none(), "{bad} must not parse");
        }
    }

    #[test]
    fn sequence_next_stops_at_four_hex_digits() {
        assert_eq!(Sequence::FIRST.next(), Some(Sequence::new(1)));
        assert_eq!(Sequence::new(0xffff).next(), None);
        assert_eq!(Sequence::new(7).to_string(), "0007");
    }

    #[test]
    fn display_time_uses_fixed_offset() {
        assert_eq!(format_display_time(&captured()), "2026-03-05T07:09:00+09:00");
    }

    #[test]
    fn bare_filename_rejects_traversal() {
        for bad in ["", ".", "..", "../etc/passwd", "a/b", "a\\b", "nul\0byte"] {
            assert!(validate_bare_filename(bad).is_err(), "{bad:?} must be rejected");
        }
        assert!(validate_bare_filename("aB3dE5gH-0000-03050709.js").is_ok());
        assert!(validate_bare_filename("..hidden").is_ok());
    }
}
