//! Unit tests for donation payload validation
//!
//! Covers required-field ordering, the amount range, timestamp
//! normalization, and idempotence of re-validation.

use chrono::{DateTime, TimeZone, Utc};
use donatrack::models::RawDonationEvent;
use donatrack::services::{validate, ValidationError};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{json, Value};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap()
}

fn valid_raw() -> RawDonationEvent {
    raw_from(json!({
        "installId": "abc",
        "amount": 5,
        "charity": "redcross",
        "host": "example.com"
    }))
}

fn raw_from(body: Value) -> RawDonationEvent {
    serde_json::from_value(body).expect("raw payload should deserialize")
}

// =============================================================================
// Required fields
// =============================================================================

#[test]
fn test_valid_payload_normalizes() {
    let event = validate(&valid_raw(), now()).expect("payload should validate");

    assert_eq!(event.install_id, "abc");
    assert_eq!(event.amount, 5.0);
    assert_eq!(event.charity, "redcross");
    assert_eq!(event.host, "example.com");
    // No timestamp sent: receipt time is used
    assert_eq!(event.event_time, now());
}

#[rstest]
#[case::install_id("installId", ValidationError::MissingInstallId)]
#[case::host("host", ValidationError::MissingHost)]
#[case::amount("amount", ValidationError::InvalidAmount)]
#[case::charity("charity", ValidationError::MissingCharity)]
fn test_missing_required_field(#[case] field: &str, #[case] expected: ValidationError) {
    let mut body = json!({
        "installId": "abc",
        "amount": 5,
        "charity": "redcross",
        "host": "example.com"
    });
    body.as_object_mut().unwrap().remove(field);

    assert_eq!(validate(&raw_from(body), now()), Err(expected));
}

#[test]
fn test_first_failure_wins() {
    // Everything is wrong; installId is checked first
    let raw = raw_from(json!({ "amount": -1 }));
    assert_eq!(
        validate(&raw, now()),
        Err(ValidationError::MissingInstallId)
    );
}

#[test]
fn test_empty_string_field_is_missing() {
    let raw = raw_from(json!({
        "installId": "",
        "amount": 5,
        "charity": "redcross",
        "host": "example.com"
    }));
    assert_eq!(
        validate(&raw, now()),
        Err(ValidationError::MissingInstallId)
    );
}

#[test]
fn test_non_string_field_is_missing() {
    let raw = raw_from(json!({
        "installId": 42,
        "amount": 5,
        "charity": "redcross",
        "host": "example.com"
    }));
    assert_eq!(
        validate(&raw, now()),
        Err(ValidationError::MissingInstallId)
    );
}

#[test]
fn test_overlong_fields_are_invalid() {
    let raw = raw_from(json!({
        "installId": "x".repeat(201),
        "amount": 5,
        "charity": "redcross",
        "host": "example.com"
    }));
    assert_eq!(
        validate(&raw, now()),
        Err(ValidationError::InvalidInstallId)
    );

    let raw = raw_from(json!({
        "installId": "abc",
        "amount": 5,
        "charity": "c".repeat(201),
        "host": "example.com"
    }));
    assert_eq!(validate(&raw, now()), Err(ValidationError::InvalidCharity));

    let raw = raw_from(json!({
        "installId": "abc",
        "amount": 5,
        "charity": "redcross",
        "host": "h".repeat(301)
    }));
    assert_eq!(validate(&raw, now()), Err(ValidationError::InvalidHost));
}

#[test]
fn test_fields_at_length_bound_pass() {
    let raw = raw_from(json!({
        "installId": "x".repeat(200),
        "amount": 5,
        "charity": "c".repeat(200),
        "host": "h".repeat(300)
    }));
    assert!(validate(&raw, now()).is_ok());
}

// =============================================================================
// Amount
// =============================================================================

#[rstest]
#[case::small(json!(0.01), 0.01)]
#[case::integer(json!(5), 5.0)]
#[case::upper_bound(json!(1000), 1000.0)]
#[case::numeric_string(json!("12.50"), 12.5)]
fn test_amount_accepted(#[case] amount: Value, #[case] expected: f64) {
    let mut body = json!({
        "installId": "abc",
        "charity": "redcross",
        "host": "example.com"
    });
    body.as_object_mut().unwrap().insert("amount".into(), amount);

    let event = validate(&raw_from(body), now()).expect("amount should be accepted");
    assert_eq!(event.amount, expected);
}

#[rstest]
#[case::zero(json!(0))]
#[case::negative(json!(-5))]
#[case::over_limit(json!(1001))]
#[case::just_over(json!(1000.01))]
#[case::nan_string(json!("NaN"))]
#[case::infinity_string(json!("inf"))]
#[case::empty_string(json!(""))]
#[case::garbage_string(json!("abc"))]
#[case::boolean(json!(true))]
#[case::null(json!(null))]
fn test_amount_rejected(#[case] amount: Value) {
    let mut body = json!({
        "installId": "abc",
        "charity": "redcross",
        "host": "example.com"
    });
    body.as_object_mut().unwrap().insert("amount".into(), amount);

    assert_eq!(
        validate(&raw_from(body), now()),
        Err(ValidationError::InvalidAmount)
    );
}

// =============================================================================
// Timestamp
// =============================================================================

#[test]
fn test_timestamp_epoch_millis_number() {
    let mut raw = valid_raw();
    raw.timestamp = Some(json!(1_700_000_000_000i64));

    let event = validate(&raw, now()).expect("timestamp should parse");
    assert_eq!(
        event.event_time,
        Utc.timestamp_millis_opt(1_700_000_000_000).unwrap()
    );
}

#[test]
fn test_timestamp_digit_string_is_epoch_millis() {
    // "1700000000000" is a time, not a date string
    let mut raw = valid_raw();
    raw.timestamp = Some(json!("1700000000000"));

    let event = validate(&raw, now()).expect("timestamp should parse");
    assert_eq!(
        event.event_time,
        Utc.timestamp_millis_opt(1_700_000_000_000).unwrap()
    );
}

#[test]
fn test_timestamp_rfc3339_string() {
    let mut raw = valid_raw();
    raw.timestamp = Some(json!("2026-01-10T08:30:00+01:00"));

    let event = validate(&raw, now()).expect("timestamp should parse");
    assert_eq!(
        event.event_time,
        Utc.with_ymd_and_hms(2026, 1, 10, 7, 30, 0).unwrap()
    );
}

#[test]
fn test_timestamp_date_only_string() {
    let mut raw = valid_raw();
    raw.timestamp = Some(json!("2026-01-10"));

    let event = validate(&raw, now()).expect("timestamp should parse");
    assert_eq!(
        event.event_time,
        Utc.with_ymd_and_hms(2026, 1, 10, 0, 0, 0).unwrap()
    );
}

#[test]
fn test_timestamp_empty_string_defaults_to_now() {
    let mut raw = valid_raw();
    raw.timestamp = Some(json!(""));

    let event = validate(&raw, now()).expect("empty timestamp should default");
    assert_eq!(event.event_time, now());
}

#[rstest]
#[case::garbage(json!("not a date"))]
#[case::boolean(json!(true))]
#[case::object(json!({"ms": 1}))]
fn test_timestamp_rejected(#[case] timestamp: Value) {
    let mut raw = valid_raw();
    raw.timestamp = Some(timestamp);

    assert_eq!(
        validate(&raw, now()),
        Err(ValidationError::InvalidTimestamp)
    );
}

// =============================================================================
// Idempotence
// =============================================================================

#[test]
fn test_revalidating_normalized_event_is_stable() {
    let mut raw = valid_raw();
    raw.timestamp = Some(json!("1700000000000"));

    let first = validate(&raw, now()).expect("payload should validate");

    // Feed the normalized record back through as a payload, with the
    // timestamp in its canonical RFC 3339 form
    let again = raw_from(json!({
        "installId": first.install_id,
        "amount": first.amount,
        "charity": first.charity,
        "host": first.host,
        "timestamp": first.event_time.to_rfc3339(),
    }));

    let second = validate(&again, now()).expect("normalized record should revalidate");
    assert_eq!(first, second);
}

// =============================================================================
// Raw payload helpers
// =============================================================================

#[test]
fn test_install_id_str_only_for_non_empty_strings() {
    assert_eq!(valid_raw().install_id_str(), Some("abc"));

    let raw = raw_from(json!({ "installId": "" }));
    assert_eq!(raw.install_id_str(), None);

    let raw = raw_from(json!({ "installId": 42 }));
    assert_eq!(raw.install_id_str(), None);

    let raw = raw_from(json!({}));
    assert_eq!(raw.install_id_str(), None);
}
