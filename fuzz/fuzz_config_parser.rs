//! Fuzz target for the TOML configuration parser.
//!
//! Run with: cargo +nightly fuzz run fuzz_config_parser
//!
//! Feeds arbitrary text to `AppConfig::parse()` and, when it parses, resolves
//! every provider's settings against `[global]`.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(config) = llmctx_config::AppConfig::parse(s) {
            for name in config.context_providers.names() {
                let _ = config.provider_settings(name);
            }
        }
    }
});
