//! Fuzz target for per-image annotation JSON parsing.
//!
//! Run with:
//!   cargo +nightly fuzz run image_json_parse

#![no_main]

use std::path::Path;

use libfuzzer_sys::fuzz_target;
use plumleaf::ir::io_image_json::from_image_json_slice;
use plumleaf::ir::CategoryId;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    // Extracting the primary record may fail on structure, but must not panic.
    if let Ok(file) = from_image_json_slice(data) {
        let _ = file.primary_record(Path::new("fuzz.json"), CategoryId::new(1));
    }
});
