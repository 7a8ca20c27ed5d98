//! Fuzz target for store.toml parsing.

#![no_main]

use cs_core::StoreConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Should never panic, only return a config error
    let _ = StoreConfig::from_toml_str(data);
});
