//! Fuzz target for unit string parsing.
//!
//! Run with:
//!   cargo +nightly fuzz run units_parse

#![no_main]

use libfuzzer_sys::fuzz_target;
use nxinstrument::units::fuzz_validate_units;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        fuzz_validate_units(input);
    }
});
