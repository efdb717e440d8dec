//! Fuzz target for the timestamp formatter.
//!
//! Run with: cargo +nightly fuzz run fuzz_format_date
//!
//! Arbitrary input must either format or come back verbatim; it must never
//! panic, whatever the display timezone.

#![no_main]

use chrono_tz::Tz;
use libfuzzer_sys::fuzz_target;
use llmctx_core::markdown::format_date;

const ZONES: [Tz; 4] = [
    chrono_tz::UTC,
    chrono_tz::America::Toronto,
    chrono_tz::Asia::Kathmandu,
    chrono_tz::Pacific::Chatham,
];

fuzz_target!(|data: &[u8]| {
    let Some((&zone, rest)) = data.split_first() else {
        return;
    };
    if let Ok(s) = std::str::from_utf8(rest) {
        let tz = ZONES[zone as usize % ZONES.len()];
        let _ = format_date(Some(s), tz);
    }
});
