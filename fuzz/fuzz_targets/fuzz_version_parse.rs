//! Fuzz target for document version parsing.
//!
//! Whatever parses must print back to something that parses to the same value.

#![no_main]

use cs_common::Version;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    if let Ok(version) = data.parse::<Version>() {
        let again: Version = version.to_string().parse().expect("display output parses");
        assert_eq!(version, again);
    }
});
