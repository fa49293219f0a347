#![no_main]

use leakhound_events::Event;
use libfuzzer_sys::fuzz_target;

const KINDS: &[&str] = &[
    "installation",
    "push",
    "issues",
    "issue_comment",
    "pull_request",
    "pull_request_review",
    "pull_request_review_comment",
    "check_suite",
    "unknown",
];

fuzz_target!(|data: (u8, &[u8])| {
    let (kind_index, body) = data;
    let kind = KINDS[kind_index as usize % KINDS.len()];

    // Decoding must never panic, whatever the body.
    if let Ok(Some(event)) = Event::decode(kind, body) {
        let _ = event.installation_id();
        let _ = event.action_accepted();
        let _ = event.sender_is_bot();
        assert_eq!(event.kind(), kind);
    }
});
