//! Integration tests for the `time`, `crypto` and `security` foundation
//! modules as they are combined to authenticate a request.

#![cfg(feature = "foundation")]

use std::time::Duration;

use chrono::{TimeZone, Utc};
use storefront_common::crypto::hmac_sha256_base64;
use storefront_common::time::{parse_timezone, request_timestamp, Clock, MockClock};
use storefront_common::SecureString;

#[test]
fn jakarta_timestamp_is_utc_plus_seven() {
    let tz = parse_timezone("Asia/Jakarta").unwrap();
    let clock = MockClock::at(Utc.with_ymd_and_hms(2024, 1, 15, 3, 4, 5).unwrap());

    assert_eq!(request_timestamp(clock.now_utc(), tz), "15/01/2024 10:04:05");

    clock.advance(Duration::from_secs(21 * 3600));
    assert_eq!(request_timestamp(clock.now_utc(), tz), "16/01/2024 07:04:05");
}

#[test]
fn signature_is_deterministic_per_timestamp() {
    let secret = SecureString::new("test-secret");
    let first = hmac_sha256_base64(secret.expose(), "15/01/2024 10:04:05").unwrap();
    let again = hmac_sha256_base64(secret.expose(), "15/01/2024 10:04:05").unwrap();

    assert_eq!(first, again);
    assert_eq!(first, "laewObSLiIyTb7Mtrbm+uE4iWN0ZAZpqQxjqsD9rKak=");
}

#[test]
fn signatures_differ_one_second_apart() {
    let tz = parse_timezone("Asia/Jakarta").unwrap();
    let clock = MockClock::at(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());

    let mut seen = std::collections::HashSet::new();
    for _ in 0..60 {
        let stamp = request_timestamp(clock.now_utc(), tz);
        assert!(seen.insert(hmac_sha256_base64("secret", &stamp).unwrap()));
        clock.advance(Duration::from_secs(1));
    }
}
