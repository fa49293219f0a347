#![no_main]

use leakhound_patterns::parse_catalogue;
use leakhound_scanner::ContentScanner;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|content: &str| {
    let patterns = parse_catalogue(
        r#"[
            {"pattern": "AKIA[0-9A-Z]{16}", "kind": "AWS"},
            {"pattern": "-----BEGIN [A-Z ]+ KEY-----", "kind": "Private Key"}
        ]"#,
    )
    .expect("static catalogue compiles");
    let scanner = ContentScanner::new(patterns);

    let Ok(matches) = scanner.scan(content) else {
        return;
    };

    let lines: Vec<&str> = content.split('\n').collect();
    for m in matches {
        // Offsets always slice the line back to the matched value.
        assert!(m.line_number >= 1 && m.line_number <= lines.len());
        let line = lines[m.line_number - 1];
        assert!(m.hit.start < m.hit.end);
        assert!(m.hit.end <= line.len());
        assert_eq!(&line[m.hit.start..m.hit.end], m.hit.value);
    }
});
