//! Fuzz target: `ArtifactName::parse` and filename validation.
//!
//! Anything that parses must re-render to a name that parses to the same
//! value and passes the bare-filename check.

#![no_main]

use codegate_core::{validate_bare_filename, ArtifactName};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(name) = std::str::from_utf8(data) else {
        return;
    };
    let bare = validate_bare_filename(name).is_ok();

    if let Some(parsed) = ArtifactName::parse(name) {
        assert!(bare, "parsed artifact names are always bare: {name:?}");
        let rendered = parsed.to_string();
        assert_eq!(ArtifactName::parse(&rendered).as_ref(), Some(&parsed));
    }
});
