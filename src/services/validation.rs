use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde_json::Value;

use crate::models::{DonationEvent, RawDonationEvent};

/// Field-level rejection reasons.
///
/// The `Display` strings are the wire contract: they go verbatim into the
/// `error` field of the 400 response, so tests and the extension can match
/// on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid JSON body")]
    InvalidBody,

    #[error("installId required")]
    MissingInstallId,

    #[error("installId invalid")]
    InvalidInstallId,

    #[error("host required")]
    MissingHost,

    #[error("host invalid")]
    InvalidHost,

    #[error("amount invalid")]
    InvalidAmount,

    #[error("charity required")]
    MissingCharity,

    #[error("charity invalid")]
    InvalidCharity,

    #[error("timestamp invalid")]
    InvalidTimestamp,
}

const MAX_INSTALL_ID_CHARS: usize = 200;
const MAX_CHARITY_CHARS: usize = 200;
const MAX_HOST_CHARS: usize = 300;

const MIN_AMOUNT_EXCLUSIVE: f64 = 0.0;
const MAX_AMOUNT: f64 = 1000.0;

/// Validates a raw submission into a normalized [`DonationEvent`].
///
/// Fields are checked in a fixed order (installId, host, amount, charity,
/// timestamp) and the first failure wins. `now` is the receipt time, used
/// when no timestamp was sent; passing it in keeps the function pure.
pub fn validate(
    raw: &RawDonationEvent,
    now: DateTime<Utc>,
) -> Result<DonationEvent, ValidationError> {
    let install_id = required_string(
        raw.install_id.as_ref(),
        MAX_INSTALL_ID_CHARS,
        ValidationError::MissingInstallId,
        ValidationError::InvalidInstallId,
    )?;

    let host = required_string(
        raw.host.as_ref(),
        MAX_HOST_CHARS,
        ValidationError::MissingHost,
        ValidationError::InvalidHost,
    )?;

    let amount = parse_amount(raw.amount.as_ref())?;

    let charity = required_string(
        raw.charity.as_ref(),
        MAX_CHARITY_CHARS,
        ValidationError::MissingCharity,
        ValidationError::InvalidCharity,
    )?;

    let event_time = parse_event_time(raw.timestamp.as_ref(), now)?;

    Ok(DonationEvent {
        install_id,
        amount,
        charity,
        host,
        event_time,
    })
}

/// A required string field: must be a non-empty JSON string within the
/// length bound. Absent, null, empty, or non-string values are "required";
/// over-long values are "invalid".
fn required_string(
    value: Option<&Value>,
    max_chars: usize,
    missing: ValidationError,
    invalid: ValidationError,
) -> Result<String, ValidationError> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => {
            if s.chars().count() <= max_chars {
                Ok(s.clone())
            } else {
                Err(invalid)
            }
        }
        _ => Err(missing),
    }
}

/// Amount must be a JSON number or a string that parses as one, finite and
/// in (0, 1000]. An empty string is a parse failure, never zero.
fn parse_amount(value: Option<&Value>) -> Result<f64, ValidationError> {
    let amount = match value {
        Some(Value::Number(n)) => n.as_f64().ok_or(ValidationError::InvalidAmount)?,
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| ValidationError::InvalidAmount)?,
        _ => return Err(ValidationError::InvalidAmount),
    };

    if !amount.is_finite() || amount <= MIN_AMOUNT_EXCLUSIVE || amount > MAX_AMOUNT {
        return Err(ValidationError::InvalidAmount);
    }

    Ok(amount)
}

/// Timestamp normalization.
///
/// Absent, null, or empty-string timestamps default to the receipt time.
/// A JSON number, or a string of nothing but ASCII digits, is epoch
/// milliseconds ("1700000000000" is a time, not a date string). Anything
/// else is parsed as a date/time string.
fn parse_event_time(
    value: Option<&Value>,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, ValidationError> {
    match value {
        None | Some(Value::Null) => Ok(now),
        Some(Value::Number(n)) => {
            let ms = n
                .as_f64()
                .filter(|f| f.is_finite())
                .ok_or(ValidationError::InvalidTimestamp)?;
            from_epoch_millis(ms as i64)
        }
        Some(Value::String(s)) if s.is_empty() => Ok(now),
        Some(Value::String(s)) if s.bytes().all(|b| b.is_ascii_digit()) => {
            let ms = s
                .parse::<i64>()
                .map_err(|_| ValidationError::InvalidTimestamp)?;
            from_epoch_millis(ms)
        }
        Some(Value::String(s)) => parse_date_string(s),
        Some(_) => Err(ValidationError::InvalidTimestamp),
    }
}

fn from_epoch_millis(ms: i64) -> Result<DateTime<Utc>, ValidationError> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or(ValidationError::InvalidTimestamp)
}

/// Free-form date strings: RFC 3339 first, then the two formats the old
/// extension builds were seen sending.
fn parse_date_string(s: &str) -> Result<DateTime<Utc>, ValidationError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&naive));
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)));
    }

    Err(ValidationError::InvalidTimestamp)
}
