//! Fuzz target for the TOML configuration parser.
//!
//! Run with: cargo +nightly fuzz run fuzz_config_parser
//!
//! Feeds arbitrary UTF-8 to `AppConfig::parse()` and, when it validates,
//! builds the rule engine so pattern parsing of every rule is exercised too.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(config) = netgate_config::AppConfig::parse(s) {
            let _ = config.build_policy_engine();
        }
    }
});
