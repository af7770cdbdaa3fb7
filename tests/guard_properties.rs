//! End-to-end properties of the request guard.
//!
//! Drives `RequestGuard` with a manual clock and the in-memory cache, the
//! same pieces the gateway wires together.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use integrity_guard::auth::{RequestGuard, RequestSigner};
use integrity_guard::cache::MemoryCache;
use integrity_guard::clock::{Clock, ManualClock};
use integrity_guard::config::SecurityConfig;
use integrity_guard::error::{AuthErrorKind, GuardError, ValidationErrorKind};
use integrity_guard::protocol::{GuardedRequest, Headers};

const SECRET: &str = "abc123";
const NOW: u64 = 1_700_000_000_000;
const MINUTE: u64 = 60_000;
const CLIENT: &str = "203.0.113.7:5000";

struct TestGuard {
    guard: RequestGuard,
    clock: Arc<ManualClock>,
}

impl TestGuard {
    fn new(token: Option<&str>) -> Self {
        Self::with_config(SecurityConfig {
            token: token.map(str::to_string),
            ..SecurityConfig::default()
        })
    }

    /// Guard allowing a single admitted request per IP.
    fn single_use() -> Self {
        Self::with_config(SecurityConfig {
            token: Some(SECRET.to_string()),
            rate_max: 1,
            ..SecurityConfig::default()
        })
    }

    fn with_config(config: SecurityConfig) -> Self {
        let clock = Arc::new(ManualClock::new(NOW));
        let cache = Arc::new(MemoryCache::with_clock(clock.clone()));
        let guard = RequestGuard::with_clock(&config, cache, clock.clone());
        Self { guard, clock }
    }

    fn now(&self) -> u64 {
        self.clock.now_ms()
    }
}

fn signer() -> RequestSigner {
    RequestSigner::new(SECRET.as_bytes())
}

fn signed_headers(method: &str, path: &str, body: &[u8], timestamp_ms: u64) -> Headers {
    signer()
        .signed_headers(SECRET, method, path, body, timestamp_ms)
        .into_iter()
        .collect()
}

fn signed_request(method: &str, path: &str, body: &[u8], timestamp_ms: u64) -> GuardedRequest {
    let headers = signed_headers(method, path, body, timestamp_ms);
    let request = GuardedRequest::new(method, path, body.to_vec(), headers);
    request.with_remote_addr(Some(socket(CLIENT)))
}

/// Signed `POST /webhook` relayed by proxy `peer` for `forwarded_for`.
fn forwarded(body: &[u8], forwarded_for: &str, peer: &str) -> GuardedRequest {
    let headers = signed_headers("POST", "/webhook", body, NOW);
    let headers = headers.with("X-Forwarded-For", forwarded_for);
    let request = GuardedRequest::new("POST", "/webhook", body.to_vec(), headers);
    request.with_remote_addr(Some(socket(peer)))
}

fn socket(addr: &str) -> SocketAddr {
    addr.parse().unwrap()
}

fn is_auth(result: &Result<impl std::fmt::Debug, GuardError>, expected: AuthErrorKind) -> bool {
    matches!(result, Err(GuardError::Auth { kind }) if *kind == expected)
}

fn is_rate_limited(result: &Result<impl std::fmt::Debug, GuardError>) -> bool {
    matches!(result, Err(GuardError::RateLimited { .. }))
}

fn is_outside_window(result: &Result<impl std::fmt::Debug, GuardError>) -> bool {
    matches!(
        result,
        Err(GuardError::Auth {
            kind: AuthErrorKind::TimestampOutsideWindow { .. }
        })
    )
}

#[tokio::test]
async fn missing_secret_rejects_every_request() {
    let t = TestGuard::new(None);

    let requests = vec![
        signed_request("POST", "/webhook", b"{}", NOW),
        GuardedRequest::new("GET", "/", Vec::new(), Headers::new()),
        GuardedRequest::new(
            "POST",
            "/",
            Vec::new(),
            Headers::new().with("X-Anti-Spam-Token", SECRET),
        ),
    ];

    for request in &requests {
        let result = t.guard.check(request).await;
        let unconfigured = matches!(result, Err(GuardError::Config { .. }));
        assert!(unconfigured, "{result:?}");
    }
}

#[tokio::test]
async fn token_must_match_exactly() {
    let t = TestGuard::new(Some(SECRET));

    let signature = signer().sign("POST", "/webhook", b"{}", &NOW.to_string());
    for wrong in ["abc124", "abc12", "abc1234", "ABC123", ""] {
        let headers = Headers::new()
            .with("X-Anti-Spam-Token", wrong)
            .with("X-Anti-Spam-Timestamp", NOW.to_string())
            .with("X-Anti-Spam-Signature", signature.clone());

        let request = GuardedRequest::new("POST", "/webhook", b"{}".to_vec(), headers);
        let result = t.guard.check(&request).await;
        assert!(
            is_auth(&result, AuthErrorKind::InvalidToken),
            "{wrong:?}: {result:?}"
        );
    }

    let no_token = GuardedRequest::new("POST", "/webhook", b"{}".to_vec(), Headers::new());
    let result = t.guard.check(&no_token).await;
    assert!(is_auth(&result, AuthErrorKind::InvalidToken));
}

#[tokio::test]
async fn missing_timestamp_or_signature() {
    let t = TestGuard::new(Some(SECRET));

    let now = NOW.to_string();
    let only_token = Headers::new().with("X-Anti-Spam-Token", SECRET);
    let with_timestamp = only_token.clone().with("X-Anti-Spam-Timestamp", now);
    let with_signature = only_token.clone().with("X-Anti-Spam-Signature", "00ff");

    for headers in [only_token, with_timestamp, with_signature] {
        let request = GuardedRequest::new("POST", "/", Vec::new(), headers);
        let result = t.guard.check(&request).await;
        let expected = AuthErrorKind::MissingTimestampOrSignature;
        assert!(is_auth(&result, expected), "{result:?}");
    }
}

#[tokio::test]
async fn headers_are_case_insensitive() {
    let t = TestGuard::new(Some(SECRET));
    let signature = signer().sign("POST", "/webhook", b"{}", &NOW.to_string());

    let headers = Headers::new()
        .with("X-ANTI-SPAM-TOKEN", SECRET)
        .with("x-anti-spam-timestamp", NOW.to_string())
        .with("X-Anti-Spam-Signature", signature);
    let request = GuardedRequest::new("post", "/webhook", b"{}".to_vec(), headers);

    assert!(t.guard.check(&request).await.is_ok());
}

#[tokio::test]
async fn timestamp_window_is_enforced() {
    let t = TestGuard::new(Some(SECRET));

    let stale = signed_request("POST", "/webhook", b"{}", t.now() - 6 * MINUTE);
    assert!(is_outside_window(&t.guard.check(&stale).await));

    let recent = signed_request("POST", "/webhook", b"{}", t.now() - 4 * MINUTE);
    let admission = t.guard.check(&recent).await.unwrap();
    assert_eq!(admission.skew_ms, 4 * MINUTE);
}

#[tokio::test]
async fn tampering_with_any_signed_field_is_rejected() {
    let t = TestGuard::new(Some(SECRET));
    let body: &[u8] = br#"{"a":1}"#;
    let headers = signed_headers("POST", "/webhook", body, NOW);

    let tampered: [(&str, &str, &[u8]); 3] = [
        ("PUT", "/webhook", body),
        ("POST", "/webhook?x=1", body),
        ("POST", "/webhook", br#"{"a": 1}"#),
    ];
    for (method, path, sent) in tampered {
        let request = GuardedRequest::new(method, path, sent.to_vec(), headers.clone());
        let result = t.guard.check(&request).await;
        assert!(
            is_auth(&result, AuthErrorKind::InvalidSignature),
            "{result:?}"
        );
    }

    // Timestamp changed after signing
    let signature = headers.get("x-anti-spam-signature").unwrap();
    let shifted = Headers::new()
        .with("X-Anti-Spam-Token", SECRET)
        .with("X-Anti-Spam-Timestamp", (NOW + 1).to_string())
        .with("X-Anti-Spam-Signature", signature);
    let request = GuardedRequest::new("POST", "/webhook", body.to_vec(), shifted);
    let result = t.guard.check(&request).await;
    assert!(is_auth(&result, AuthErrorKind::InvalidSignature));

    // The untouched request still passes: rejections consumed nothing
    let original = GuardedRequest::new("POST", "/webhook", body.to_vec(), headers);
    assert!(t.guard.check(&original).await.is_ok());
}

#[tokio::test]
async fn replayed_signature_is_rejected() {
    let t = TestGuard::new(Some(SECRET));

    let headers = signed_headers("POST", "/webhook", br#"{"a":1}"#, NOW);
    let signature = headers.get("X-Anti-Spam-Signature").unwrap();
    assert_eq!(
        signature,
        "df7b9ddc57f2b388088f0371f90fbb59d6427a43d93ecf8d81bf2b0aeb072929"
    );

    let request = GuardedRequest::new("POST", "/webhook", br#"{"a":1}"#.to_vec(), headers);
    assert!(t.guard.check(&request).await.is_ok());

    let replay = t.guard.check(&request).await;
    assert!(matches!(replay, Err(GuardError::Replay)), "{replay:?}");
}

#[tokio::test]
async fn replay_ttl_and_fresh_signature() {
    let t = TestGuard::new(Some(SECRET));

    let first = signed_request("POST", "/webhook", b"{}", t.now());
    assert!(t.guard.check(&first).await.is_ok());
    let replay = t.guard.check(&first).await;
    assert!(matches!(replay, Err(GuardError::Replay)));

    // Past the replay TTL (10 minutes)
    t.clock.advance(Duration::from_millis(10 * MINUTE + 1));

    let fresh = signed_request("POST", "/webhook", b"{}", t.now());
    assert!(t.guard.check(&fresh).await.is_ok());

    // The old request is still inadmissible: its timestamp is now stale
    assert!(is_outside_window(&t.guard.check(&first).await));
}

#[tokio::test]
async fn rate_limit_is_per_ip() {
    let t = TestGuard::new(Some(SECRET));

    for i in 0..10 {
        let body = format!("{{\"n\":{i}}}");
        let request = signed_request("POST", "/webhook", body.as_bytes(), NOW);
        assert!(t.guard.check(&request).await.is_ok(), "request {i}");
    }

    let eleventh = signed_request("POST", "/webhook", b"{\"n\":10}", NOW);
    let result = t.guard.check(&eleventh).await;
    assert!(matches!(result, Err(GuardError::RateLimited { ref ip }) if ip == "203.0.113.7"));

    // A different client is unaffected
    let other = GuardedRequest::new(
        "POST",
        "/webhook",
        b"{\"n\":10}".to_vec(),
        signed_headers("POST", "/webhook", b"{\"n\":10}", NOW),
    )
    .with_remote_addr(Some(socket("198.51.100.1:5000")));
    assert!(t.guard.check(&other).await.is_ok());
}

#[tokio::test]
async fn rate_limit_resets_after_window() {
    let t = TestGuard::new(Some(SECRET));

    for i in 0..10 {
        let request = signed_request("POST", "/webhook", format!("{i}").as_bytes(), t.now());
        t.guard.check(&request).await.unwrap();
    }
    let limited = signed_request("POST", "/webhook", b"10", t.now());
    assert!(is_rate_limited(&t.guard.check(&limited).await));

    // 15 minute window
    t.clock.advance(Duration::from_millis(15 * MINUTE));

    let next = signed_request("POST", "/webhook", b"11", t.now());
    assert!(t.guard.check(&next).await.is_ok());
}

#[tokio::test]
async fn rate_limit_checked_before_signature() {
    let t = TestGuard::single_use();

    let first = signed_request("POST", "/a", b"", NOW);
    t.guard.check(&first).await.unwrap();

    // Over budget: reported as rate limited even with a bad signature
    let headers = Headers::new()
        .with("X-Anti-Spam-Token", SECRET)
        .with("X-Anti-Spam-Timestamp", NOW.to_string())
        .with("X-Anti-Spam-Signature", "deadbeef");
    let request = GuardedRequest::new("POST", "/b", Vec::new(), headers)
        .with_remote_addr(Some(socket(CLIENT)));
    assert!(is_rate_limited(&t.guard.check(&request).await));
}

#[tokio::test]
async fn rejected_request_keeps_rate_budget() {
    let t = TestGuard::single_use();

    // Signed for `{}`, sent with `{ }`
    let headers = signed_headers("POST", "/webhook", b"{}", NOW);
    let forged = GuardedRequest::new("POST", "/webhook", b"{ }".to_vec(), headers)
        .with_remote_addr(Some(socket(CLIENT)));
    let result = t.guard.check(&forged).await;
    assert!(is_auth(&result, AuthErrorKind::InvalidSignature));

    let genuine = signed_request("POST", "/webhook", b"{}", NOW);
    assert!(t.guard.check(&genuine).await.is_ok());

    let next = signed_request("POST", "/webhook", b"{}", NOW + 1);
    assert!(is_rate_limited(&t.guard.check(&next).await));
}

#[tokio::test]
async fn forwarded_for_is_the_rate_limit_key() {
    let t = TestGuard::single_use();

    let request = forwarded(b"1", "1.2.3.4, 5.6.7.8", "9.9.9.9:1234");
    let admission = t.guard.check(&request).await.unwrap();
    assert_eq!(admission.client_ip, "1.2.3.4");

    // Same socket, different forwarded client: separate budget
    let request = forwarded(b"2", "4.3.2.1", "9.9.9.9:1234");
    assert!(t.guard.check(&request).await.is_ok());

    // Same forwarded client via another proxy: budget exhausted
    let request = forwarded(b"3", "1.2.3.4", "8.8.8.8:1234");
    assert!(is_rate_limited(&t.guard.check(&request).await));
}

#[tokio::test]
async fn malformed_timestamp_is_validation_error() {
    let t = TestGuard::new(Some(SECRET));
    let signature = signer().sign("POST", "/webhook", b"{}", "not-a-number");

    let headers = Headers::new()
        .with("X-Anti-Spam-Token", SECRET)
        .with("X-Anti-Spam-Timestamp", "not-a-number")
        .with("X-Anti-Spam-Signature", signature);
    let request = GuardedRequest::new("POST", "/webhook", b"{}".to_vec(), headers);

    let result = t.guard.check(&request).await;
    match result {
        Err(GuardError::Validation {
            kind: ValidationErrorKind::InvalidTimestamp { value },
        }) => assert_eq!(value, "not-a-number"),
        other => panic!("expected validation error, got {other:?}"),
    }
}
