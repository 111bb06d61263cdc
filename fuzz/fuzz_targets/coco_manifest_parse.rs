//! Fuzz target for COCO manifest parsing.
//!
//! Any manifest that parses is also run through the integrity check, which
//! must report rather than panic on whatever references it contains.
//!
//! Run with:
//!   cargo +nightly fuzz run coco_manifest_parse

#![no_main]

use libfuzzer_sys::fuzz_target;
use plumleaf::ir::io_coco_json::from_coco_slice;
use plumleaf::validation::validate_manifest;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    if let Ok(manifest) = from_coco_slice(data) {
        let _ = validate_manifest(&manifest);
    }
});
