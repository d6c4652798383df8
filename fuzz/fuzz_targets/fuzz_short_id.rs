//! Fuzz target: `ShortId::derive` over arbitrary seeds.
//!
//! Every derived id is eight alphabet characters and parses back.

#![no_main]

use codegate_core::{ShortId, SHORT_ID_ALPHABET, SHORT_ID_LEN};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let seed = String::from_utf8_lossy(data);
    let id = ShortId::derive(&seed);

    assert_eq!(id.as_str().len(), SHORT_ID_LEN);
    assert!(id.as_str().bytes().all(|b| SHORT_ID_ALPHABET.contains(&b)));
    assert_eq!(ShortId::parse(id.as_str()).ok(), Some(id.clone()));
    assert_eq!(ShortId::derive(&seed), id, "derivation is deterministic");
});
