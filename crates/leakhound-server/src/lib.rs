//! Webhook dispatcher for leakhound.
//!
//! One POST route at the configured path. Per request: verify the
//! platform signature (HMAC-SHA256, constant time), decode the event
//! variant, filter by sender kind and action verb, mint a
//! per-installation platform client, and run scan-then-rectify under the
//! per-event budget.
//!
//! Status mapping: 400 for signature or decode failures, 200 for
//! everything handled or deliberately ignored, 500 when a downstream
//! platform call fails (the platform redelivers; redaction is
//! idempotent, so retries are safe).

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use hmac::{Hmac, Mac};
use leakhound_core::{CheckSuiteRunner, Error, PayloadScanner, Rectifier};
use leakhound_events::Event;
use leakhound_github::ClientFactory;
use leakhound_types::ScanResult as _;
use sha2::Sha256;
use tracing::{error, info, warn};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the HMAC-SHA256 signature of the raw body.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Header naming the event variant.
pub const EVENT_HEADER: &str = "x-github-event";

/// Header carrying the delivery id, logged with downstream failures.
pub const DELIVERY_HEADER: &str = "x-github-delivery";

/// Budget for handling one event end to end. Expiry cancels in-flight
/// outbound calls and answers 500.
pub const DEFAULT_EVENT_BUDGET: Duration = Duration::from_secs(120);

/// Shared state behind the webhook route.
pub struct AppState {
    /// Shared secret the platform signs deliveries with.
    pub secret: String,
    /// The scanning facade, holding the catalogue and file cache.
    pub scanner: PayloadScanner,
    /// Mints a per-installation platform client for each event.
    pub factory: ClientFactory,
    /// Per-event handling budget.
    pub event_budget: Duration,
}

/// Build the router with the webhook route at `path`.
pub fn build_app(state: Arc<AppState>, path: &str) -> Router {
    Router::new()
        .route(path, post(handle_webhook))
        .with_state(state)
}

/// Verify the delivery signature against the shared secret.
///
/// The header format is `sha256=<hex digest>`. Comparison happens inside
/// `Mac::verify_slice`, which is constant-time in the signature length.
pub fn verify_signature(secret: &str, header: Option<&HeaderValue>, body: &[u8]) -> bool {
    let Some(header) = header.and_then(|value| value.to_str().ok()) else {
        return false;
    };
    let Some(hex_digest) = header.strip_prefix("sha256=") else {
        return false;
    };
    let Ok(signature) = hex::decode(hex_digest) else {
        return false;
    };

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(body);
    mac.verify_slice(&signature).is_ok()
}

async fn handle_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let delivery = headers
        .get(DELIVERY_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    if !verify_signature(&state.secret, headers.get(SIGNATURE_HEADER), &body) {
        warn!(delivery = %delivery, "rejected delivery with a bad signature");
        return (StatusCode::BAD_REQUEST, "invalid signature").into_response();
    }

    let Some(kind) = headers
        .get(EVENT_HEADER)
        .and_then(|value| value.to_str().ok())
    else {
        return (StatusCode::OK, "ignored").into_response();
    };

    let event = match Event::decode(kind, &body) {
        Ok(Some(event)) => event,
        Ok(None) => {
            info!(delivery = %delivery, kind, "ignoring unhandled event kind");
            return (StatusCode::OK, "ignored").into_response();
        }
        Err(err) => {
            warn!(delivery = %delivery, kind, error = %err, "failed to decode event payload");
            return (StatusCode::BAD_REQUEST, "invalid payload").into_response();
        }
    };

    if event.bot_filter_applies() && event.sender_is_bot() {
        info!(delivery = %delivery, kind, "ignoring bot-triggered event");
        return (StatusCode::OK, "ignored").into_response();
    }

    if !event.action_accepted() {
        info!(delivery = %delivery, kind, "ignoring unlisted action");
        return (StatusCode::OK, "ignored").into_response();
    }

    match tokio::time::timeout(state.event_budget, process_event(&state, &event)).await {
        Ok(Ok(())) => (StatusCode::OK, "ok").into_response(),
        Ok(Err(Error::Validation(reason))) => {
            warn!(delivery = %delivery, kind, %reason, "event failed validation");
            (StatusCode::BAD_REQUEST, "invalid payload").into_response()
        }
        Ok(Err(err)) => {
            error!(delivery = %delivery, kind, error = %err, "event handling failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "handling failed").into_response()
        }
        Err(_elapsed) => {
            error!(delivery = %delivery, kind, "event handling exceeded the budget");
            (StatusCode::INTERNAL_SERVER_ERROR, "handling timed out").into_response()
        }
    }
}

async fn process_event(state: &AppState, event: &Event) -> Result<(), Error> {
    let client = state.factory.client_for(event.installation_id()).await?;
    let rectifier = Rectifier::new(&client);

    match event {
        Event::Installation(installation) => {
            info!(
                installation = installation.installation.id,
                action = %installation.action,
                "installation event acknowledged"
            );
        }
        Event::Push(push) => {
            let results = state.scanner.check_push(&client, push).await?;
            if results.is_empty() {
                info!("no matches to address");
            } else {
                rectifier.rectify_push(push, &results).await?;
            }
        }
        Event::Issues(issues) => {
            let result = state.scanner.check_issue(issues);
            if result.has_matches() {
                rectifier.rectify_issue(issues, &result).await?;
            }
        }
        Event::IssueComment(comment) => {
            let result = state.scanner.check_issue_comment(comment);
            if result.has_matches() {
                rectifier.rectify_issue_comment(comment, &result).await?;
            }
        }
        Event::PullRequest(pull_request) => {
            let result = state.scanner.check_pull_request(pull_request);
            if result.has_matches() {
                rectifier.rectify_pull_request(pull_request, &result).await?;
            }
        }
        Event::PullRequestReview(review) => {
            let result = state.scanner.check_review(review);
            if result.has_matches() {
                rectifier.rectify_review(review, &result).await?;
            }
        }
        Event::PullRequestReviewComment(comment) => {
            let result = state.scanner.check_review_comment(comment);
            if result.has_matches() {
                rectifier.rectify_review_comment(comment, &result).await?;
            }
        }
        Event::CheckSuite(check_suite) => {
            CheckSuiteRunner::new(&client, &state.scanner)
                .run(check_suite)
                .await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signature_for(secret: &str, body: &[u8]) -> HeaderValue {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac");
        mac.update(body);
        let digest = hex::encode(mac.finalize().into_bytes());
        HeaderValue::from_str(&format!("sha256={digest}")).expect("header")
    }

    #[test]
    fn valid_signature_is_accepted() {
        let body = br#"{"zen": "ok"}"#;
        let header = signature_for("secret", body);
        assert!(verify_signature("secret", Some(&header), body));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let body = br#"{"zen": "ok"}"#;
        let header = signature_for("other-secret", body);
        assert!(!verify_signature("secret", Some(&header), body));
    }

    #[test]
    fn tampered_body_is_rejected() {
        let header = signature_for("secret", b"original");
        assert!(!verify_signature("secret", Some(&header), b"tampered"));
    }

    #[test]
    fn missing_or_malformed_header_is_rejected() {
        assert!(!verify_signature("secret", None, b"body"));

        let unprefixed = HeaderValue::from_static("deadbeef");
        assert!(!verify_signature("secret", Some(&unprefixed), b"body"));

        let bad_hex = HeaderValue::from_static("sha256=zzzz");
        assert!(!verify_signature("secret", Some(&bad_hex), b"body"));
    }

    #[test]
    fn near_miss_signature_is_rejected() {
        let body = b"body";
        let header = signature_for("secret", body);
        let mut near_miss = header.to_str().expect("ascii").to_string();
        // Flip the last hex digit.
        let last = near_miss.pop().expect("digit");
        near_miss.push(if last == '0' { '1' } else { '0' });
        let header = HeaderValue::from_str(&near_miss).expect("header");
        assert!(!verify_signature("secret", Some(&header), body));
    }
}
