//! Fuzz target for TFRecord framing and example decoding.

#![no_main]

use std::path::Path;

use libfuzzer_sys::fuzz_target;
use odrecord::record::{decode_example, TfRecordReader};

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let path = Path::new("<fuzz>");
    for (index, payload) in TfRecordReader::new(data, path).enumerate() {
        let Ok(payload) = payload else { break };
        let _ = decode_example(&payload, index, path);
    }
});
