//! Fuzz target for single annotation record parsing.
//!
//! Feeds arbitrary UTF-8 lines to the record parser, which has to pick
//! between the current and the legacy schema by token count.

#![no_main]

use libfuzzer_sys::fuzz_target;
use xrant::model::io_list_txt::fuzz_parse_record_line;

fuzz_target!(|data: &[u8]| {
    if data.len() > 1024 * 1024 {
        return;
    }

    let Ok(line) = std::str::from_utf8(data) else {
        return;
    };

    let _ = fuzz_parse_record_line(line);
});
