/*!
The response envelope and structured error taxonomy (§3, §7). Every successful
vocabulary call returns `Envelope`; every failed one is mapped to an
`ErrorDescriptor` with a numeric code from the documented band for its error
family, plus the standard JSON-RPC codes for request-level failures.
*/

use qtmcp::ProbeError;
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
  pub result: Value,
  pub meta: Meta,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Meta {
  pub timestamp: u64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub object_id: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub numeric_id: Option<u64>,
}

impl Envelope {
  pub fn new(result: Value) -> Self {
    Self {
      result,
      meta: Meta {
        timestamp: now_ms(),
        ..Meta::default()
      },
    }
  }

  #[must_use]
  pub fn with_object_id(mut self, object_id: impl Into<String>) -> Self {
    self.meta.object_id = Some(object_id.into());
    self
  }

  #[must_use]
  pub const fn with_numeric_id(mut self, numeric_id: u64) -> Self {
    self.meta.numeric_id = Some(numeric_id);
    self
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorDescriptor {
  pub code: i64,
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub data: Option<Value>,
}

/// JSON-RPC 2.0 standard codes, for request-level (not domain) failures.
pub mod standard {
  pub const PARSE_ERROR: i64 = -32700;
  pub const INVALID_REQUEST: i64 = -32600;
  pub const METHOD_NOT_FOUND: i64 = -32601;
  pub const INVALID_PARAMS: i64 = -32602;
  pub const INTERNAL_ERROR: i64 = -32603;
}

pub fn standard_error(code: i64, message: impl Into<String>) -> ErrorDescriptor {
  ErrorDescriptor {
    code,
    message: message.into(),
    data: None,
  }
}

/// Maps a probe-layer error to its documented code band (§3, §7): object
/// (-32001..-32009), property (-32010..-32019), method (-32020..-32029), signal
/// (-32030..-32039), UI (-32040..-32049), name-map (-32050..-32059).
pub fn from_probe_error(err: ProbeError) -> ErrorDescriptor {
  let message = err.to_string();
  let (code, data) = match err {
    ProbeError::ObjectNotFound { id } => (-32001, json!({ "hint": format!("no object resolves to {id}") })),
    ProbeError::ObjectStale { id } => (-32002, json!({ "hint": format!("{id} was live but has since been destroyed") })),
    ProbeError::ObjectNotAWidget { actual_class, .. } => (-32003, json!({ "actualClass": actual_class })),

    ProbeError::PropertyNotFound { available, .. } => (-32010, json!({ "available": available })),
    ProbeError::PropertyReadOnly { .. } => (-32011, Value::Null),
    ProbeError::PropertyTypeMismatch { expected, .. } => (-32012, json!({ "expected": expected })),

    ProbeError::MethodNotFound { available, .. } => (-32020, json!({ "available": available })),
    ProbeError::MethodInvocationFailed { reason, .. } => (-32021, json!({ "hint": reason })),
    ProbeError::MethodArgumentMismatch { candidates, .. } => (-32022, json!({ "available": candidates })),

    ProbeError::SignalNotFound { .. } => (-32030, Value::Null),
    ProbeError::SubscriptionNotFound { .. } => (-32031, Value::Null),

    ProbeError::WidgetNotVisible { .. } => (-32040, Value::Null),
    ProbeError::WidgetNotEnabled { .. } => (-32041, Value::Null),
    ProbeError::CaptureError { reason } => (-32042, json!({ "hint": reason })),
    ProbeError::RefExpired { ref_id } => (
      -32043,
      json!({ "hint": "ref expired — call read_page again", "received": ref_id }),
    ),

    ProbeError::NameNotFound(_) => (-32050, Value::Null),
    ProbeError::NameAlreadyExists(_) => (-32051, Value::Null),
    ProbeError::NameMapError(_) => (-32052, Value::Null),

    ProbeError::Internal(_) => (standard::INTERNAL_ERROR, Value::Null),
  };

  ErrorDescriptor {
    code,
    message,
    data: (!data.is_null()).then_some(data),
  }
}

fn now_ms() -> u64 {
  std::time::SystemTime::now()
    .duration_since(std::time::UNIX_EPOCH)
    .map(|d| d.as_millis() as u64)
    .unwrap_or(0)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn object_band_errors_map_to_the_documented_range() {
    let desc = from_probe_error(ProbeError::ObjectNotFound { id: "X".to_string() });
    assert_eq!(desc.code, -32001);
  }

  #[test]
  fn ref_expired_mentions_re_reading() {
    let desc = from_probe_error(ProbeError::RefExpired { ref_id: 7 });
    assert!(desc.message.contains("re-read") || desc.data.as_ref().unwrap()["hint"].as_str().unwrap().contains("re-read"));
  }

  #[test]
  fn envelope_always_has_a_numeric_timestamp() {
    let envelope = Envelope::new(json!({"ok": true}));
    assert!(envelope.meta.timestamp > 0);
  }
}
