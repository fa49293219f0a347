#![no_main]

use leakhound_patterns::parse_catalogue;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|json: &str| {
    // Loading must never panic; it either compiles the whole catalogue
    // or rejects it.
    if let Ok(patterns) = parse_catalogue(json) {
        for pattern in &patterns {
            // A loaded pattern never matches the empty string.
            assert!(!pattern.regex().is_match(""));
        }
    }
});
