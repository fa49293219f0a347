#![no_main]

use leakhound_core::redact_matches;
use leakhound_patterns::parse_catalogue;
use leakhound_scanner::ContentScanner;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|content: &str| {
    let patterns = parse_catalogue(r#"[{"pattern": "AKIA[0-9A-Z]{16}", "kind": "AWS"}]"#)
        .expect("static catalogue compiles");
    let scanner = ContentScanner::new(patterns);

    let Ok(matches) = scanner.scan(content) else {
        return;
    };

    let redacted = redact_matches(content, &matches);

    // Redaction preserves codepoint length.
    assert_eq!(content.chars().count(), redacted.chars().count());

    // For ASCII bodies, byte offsets and codepoint indices coincide and
    // a second pass is a fixpoint.
    if content.is_ascii() {
        let rescan = scanner.scan(&redacted).expect("redacted content scans");
        assert!(rescan.is_empty());
        assert_eq!(redact_matches(&redacted, &rescan), redacted);
    }
});
