//! Fuzz target for the `pipeline.config` rewriter.
//!
//! A successful rewrite must be stable: rewriting its output again gives
//! the same text.

#![no_main]

use libfuzzer_sys::fuzz_target;
use odrecord::job::fuzz_rewrite_pipeline_config;

fuzz_target!(|data: &[u8]| {
    if data.len() > 1024 * 1024 {
        return;
    }
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(config) = fuzz_rewrite_pipeline_config(text) {
        let again = fuzz_rewrite_pipeline_config(&config).expect("rewrite rewritten config");
        assert_eq!(again, config);
    }
});
