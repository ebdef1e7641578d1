//! Fuzz target for LabelMe JSON annotation parsing.

#![no_main]

use libfuzzer_sys::fuzz_target;
use odrecord::annotation::io_json::from_json_slice;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    if let Ok(parsed) = from_json_slice(data) {
        // Every accepted shape carries a label.
        assert!(parsed.objects.iter().all(|o| !o.label.is_empty()));
    }
});
