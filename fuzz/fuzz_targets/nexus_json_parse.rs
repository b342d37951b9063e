//! Fuzz target for the NeXus JSON instrument reader.
//!
//! Feeds arbitrary bytes through JSON parsing, both reader passes and the
//! writer, checking for panics or hangs.
//!
//! Run with:
//!   cargo +nightly fuzz run nexus_json_parse

#![no_main]

use libfuzzer_sys::fuzz_target;
use nxinstrument::json::{from_json_slice, to_json_string, NexusJsonWriter, ReadOptions};

fuzz_target!(|data: &[u8]| {
    // NeXus structures with full meshes can be large, but 10MB is plenty.
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let opts = ReadOptions {
        fail_on_cycle: false,
    };
    if let Ok(outcome) = from_json_slice(data, &opts) {
        let _ = nxinstrument::validation::validate_instrument(
            &outcome.instrument,
            &nxinstrument::validation::ValidateOptions::default(),
        );
        let _ = to_json_string(&outcome.instrument, &NexusJsonWriter::new());
    }
});
