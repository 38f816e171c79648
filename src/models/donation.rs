use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

/// Raw submission body as sent by the extension.
///
/// Every field is an untyped `Value` on purpose: the validator decides what
/// counts as a string or a number, so a payload like `{"amount": "abc"}`
/// deserializes fine here and is rejected with a field-level error instead
/// of a serde error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDonationEvent {
    pub install_id: Option<Value>,
    pub amount: Option<Value>,
    pub charity: Option<Value>,
    pub host: Option<Value>,
    pub timestamp: Option<Value>,
}

impl RawDonationEvent {
    /// The reported install id, if it is a non-empty string.
    /// Used for rate-limit key derivation before validation runs.
    pub fn install_id_str(&self) -> Option<&str> {
        match &self.install_id {
            Some(Value::String(s)) if !s.is_empty() => Some(s),
            _ => None,
        }
    }
}

/// A fully validated donation event, ready for the sink.
/// Only the validator constructs these.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DonationEvent {
    pub install_id: String,
    pub amount: f64,
    pub charity: String,
    pub host: String,
    pub event_time: DateTime<Utc>,
}

/// A persisted donation read back from the `donations` table
#[derive(Debug, Clone, FromRow)]
pub struct DonationRow {
    pub id: i64,
    pub install_id: String,
    pub amount: f64,
    pub charity: String,
    pub host: String,
    pub event_time: String,
    pub received_at: DateTime<Utc>,
}
