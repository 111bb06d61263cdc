//! Fuzz target for the per-image annotation CSV reader.
//!
//! Rows that fail to parse must be dropped, never panic.
//!
//! Run with:
//!   cargo +nightly fuzz run annotation_csv_parse

#![no_main]

use libfuzzer_sys::fuzz_target;
use plumleaf::ir::io_annotation_csv::{from_annotation_csv_slice, to_annotation_csv_string};

fuzz_target!(|data: &[u8]| {
    if data.len() > 1024 * 1024 {
        return;
    }

    // Whatever survives normalization must be writable again.
    if let Ok(batch) = from_annotation_csv_slice(data) {
        let _ = to_annotation_csv_string(&batch.records);
    }
});
