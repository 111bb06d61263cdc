#![allow(dead_code)]

use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// Finite box values as they appear in source files: whole pixels or two
/// decimal places, so their text form parses back to the same f64.
pub fn arb_coord() -> impl Strategy<Value = f64> {
    prop_oneof![
        (0u32..4096).prop_map(f64::from),
        (0u32..409_600).prop_map(|v| f64::from(v) / 100.0),
    ]
}

/// Image stems: lowercase, digits and underscores, never empty.
pub fn arb_stem() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,11}"
}

/// Category names drawn from a small fixed pool.
pub fn arb_category() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("healthy".to_string()),
        Just("dry".to_string()),
        Just("sooty_mold".to_string()),
    ]
}
