//! Fuzz target: JSON deserialization of `ExecuteBody`.
//!
//! Arbitrary bytes posted to `/execute` must be rejected cleanly, never
//! panic.

#![no_main]

use codegate_gateway::routes::ExecuteBody;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = serde_json::from_slice::<ExecuteBody>(data);
});
