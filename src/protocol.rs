//! Wire types for the document storage HTTP API.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Naive layouts accepted for timestamps that are not RFC 3339. Read as UTC.
const NAIVE_TIMESTAMP_FORMATS: &[&str] = &[
  "%Y-%m-%d %H:%M:%S%.f",
  "%Y-%m-%dT%H:%M:%S%.f",
  "%Y-%m-%d %H:%M:%S",
  "%Y-%m-%dT%H:%M:%S",
];

/// Server-assigned revision marker. Numeric on most servers, but kept as text
/// when the server sends anything else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Version {
  Number(u64),
  Text(String),
}

impl Version {
  /// Numeric value, parsing text versions such as `"3"`.
  pub fn as_u64(&self) -> Option<u64> {
    match self {
      Version::Number(n) => Some(*n),
      Version::Text(s) => s.parse().ok(),
    }
  }
}

/// A stored record as the server returns it.
///
/// Metadata is decoded leniently: a malformed timestamp becomes `None` and
/// `data: null` becomes an empty payload, so one odd record does not fail a
/// whole response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
  #[serde(default)]
  pub id: Option<String>,
  #[serde(default)]
  pub collection: String,
  #[serde(default, deserialize_with = "lenient_data")]
  pub data: Map<String, Value>,
  #[serde(default, deserialize_with = "lenient_version")]
  pub version: Option<Version>,
  #[serde(default, deserialize_with = "lenient_timestamp")]
  pub created_at: Option<DateTime<Utc>>,
  #[serde(default, deserialize_with = "lenient_timestamp")]
  pub updated_at: Option<DateTime<Utc>>,
  #[serde(default, deserialize_with = "lenient_timestamp")]
  pub ttl_at: Option<DateTime<Utc>>,
}

/// Parse an RFC 3339 timestamp, falling back to naive `YYYY-MM-DD HH:MM:SS`
/// forms taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
  if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
    return Some(ts.with_timezone(&Utc));
  }
  NAIVE_TIMESTAMP_FORMATS
    .iter()
    .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
    .map(|naive| naive.and_utc())
}

fn lenient_data<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Map<String, Value>, D::Error> {
  Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_version<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Version>, D::Error> {
  Ok(match Value::deserialize(deserializer)? {
    Value::Null => None,
    Value::Number(n) => Some(match n.as_u64() {
      Some(v) => Version::Number(v),
      None => Version::Text(n.to_string()),
    }),
    Value::String(s) => Some(Version::Text(s)),
    other => Some(Version::Text(other.to_string())),
  })
}

fn lenient_timestamp<'de, D: Deserializer<'de>>(
  deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
  Ok(match Value::deserialize(deserializer)? {
    Value::String(raw) => {
      let parsed = parse_timestamp(&raw);
      if parsed.is_none() {
        tracing::debug!(%raw, "ignoring unparseable timestamp");
      }
      parsed
    }
    _ => None,
  })
}

/// Every successful response wraps its payload in `{"data": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
  pub data: T,
}

/// Payload of a list/query response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordPage {
  #[serde(default)]
  pub data: Vec<Record>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub pagination: Option<Pagination>,
}

/// Pagination metadata reported by the server alongside a page of records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pagination {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub page: Option<u64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub limit: Option<u64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub total: Option<u64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub total_pages: Option<u64>,
  /// Any further fields the server includes.
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

/// Body of create (`POST`) and update (`PUT`) requests.
#[derive(Debug, Clone, Serialize)]
pub struct WriteBody<'a> {
  pub data: &'a Map<String, Value>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub ttl_at: Option<DateTime<Utc>>,
}

/// Body of merge (`PATCH .../patch`) requests.
#[derive(Debug, Clone, Serialize)]
pub struct PatchBody<'a> {
  pub data: &'a Map<String, Value>,
}

/// Pull the server's structured error message out of a failed response body.
///
/// Accepts `{"error": "..."}`, `{"error": {"message": "..."}}` and
/// `{"message": "..."}`.
pub fn error_message(body: &Value) -> Option<String> {
  let from_error = match body.get("error") {
    Some(Value::String(s)) => Some(s.clone()),
    Some(Value::Object(obj)) => obj
      .get("message")
      .and_then(Value::as_str)
      .map(str::to_string),
    _ => None,
  };

  from_error.or_else(|| {
    body
      .get("message")
      .and_then(Value::as_str)
      .map(str::to_string)
  })
}
