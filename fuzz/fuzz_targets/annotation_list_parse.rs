//! Fuzz target for whole annotation list parsing.
//!
//! Anything that parses must render again and parse to the same number of
//! images.

#![no_main]

use libfuzzer_sys::fuzz_target;
use xrant::model::io_list_txt::{from_annotation_list_str, to_annotation_list_string};

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let Ok(list) = from_annotation_list_str(text) else {
        return;
    };

    // Parsed tokens never contain whitespace, so the writer accepts them.
    if let Ok(rendered) = to_annotation_list_string(&list.header, &list.images) {
        let reparsed = from_annotation_list_str(&rendered).expect("rendered list parses");
        assert_eq!(reparsed.images.len(), list.images.len());
    }
});
