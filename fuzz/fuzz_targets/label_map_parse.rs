//! Fuzz target for `label_map.pbtxt` parsing.
//!
//! Anything the parser accepts must survive being written and read again.

#![no_main]

use libfuzzer_sys::fuzz_target;
use odrecord::label_map::{from_pbtxt_str, to_pbtxt_string};

fuzz_target!(|data: &[u8]| {
    if data.len() > 1024 * 1024 {
        return;
    }
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(map) = from_pbtxt_str(text) {
        let again = from_pbtxt_str(&to_pbtxt_string(&map)).expect("re-read written label map");
        assert_eq!(again, map);
    }
});
