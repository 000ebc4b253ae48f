/*!
JSON-RPC 2.0 framing and prefix-based dispatch across the three vocabularies.
*/

use crate::envelope::{self, standard, Envelope, ErrorDescriptor};
use crate::vocab;
use qtmcp::Probe;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct RpcRequest {
  pub jsonrpc: String,
  pub method: String,
  #[serde(default)]
  pub params: Value,
}

#[derive(Debug, Serialize)]
pub struct RpcResponse {
  pub jsonrpc: &'static str,
  pub id: Value,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub result: Option<Envelope>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<ErrorDescriptor>,
}

impl RpcResponse {
  fn ok(id: Value, envelope: Envelope) -> Self {
    Self {
      jsonrpc: "2.0",
      id,
      result: Some(envelope),
      error: None,
    }
  }

  fn err(id: Value, error: ErrorDescriptor) -> Self {
    Self {
      jsonrpc: "2.0",
      id,
      result: None,
      error: Some(error),
    }
  }
}

/// Parses, dispatches, and formats one request frame. Returns `None` for a
/// notification (§4.5: a request with no `id` member, or an explicit `id: null`)
/// — the caller must not write anything back to the socket for those, no matter
/// how dispatch resolves.
pub fn handle_frame(probe: &Arc<Probe>, raw: &str) -> Option<RpcResponse> {
  let value: Value = match serde_json::from_str(raw) {
    Ok(v) => v,
    Err(e) => return Some(RpcResponse::err(Value::Null, envelope::standard_error(standard::PARSE_ERROR, e.to_string()))),
  };

  let as_object = value.as_object();
  let is_notification = as_object.map_or(false, |obj| obj.get("id").map_or(true, Value::is_null));
  let id = as_object.and_then(|obj| obj.get("id")).cloned().filter(|v| !v.is_null()).unwrap_or(Value::Null);

  let request: RpcRequest = match serde_json::from_value(value) {
    Ok(r) if r.jsonrpc == "2.0" => r,
    Ok(_) => {
      let error = envelope::standard_error(standard::INVALID_REQUEST, "jsonrpc must be \"2.0\"".to_string());
      return (!is_notification).then(|| RpcResponse::err(id, error));
    }
    Err(e) => {
      let error = envelope::standard_error(standard::INVALID_REQUEST, e.to_string());
      return (!is_notification).then(|| RpcResponse::err(id, error));
    }
  };

  let outcome = dispatch(probe, &request.method, &request.params);
  if is_notification {
    return None;
  }
  Some(match outcome {
    Ok(value) => RpcResponse::ok(id, Envelope::new(value)),
    Err(descriptor) => RpcResponse::err(id, descriptor),
  })
}

/// Routes a method by its `qt.` / `cu.` / `chr.` prefix. Unprefixed or
/// unrecognized methods are a standard JSON-RPC "method not found".
pub fn dispatch(probe: &Arc<Probe>, method: &str, params: &Value) -> Result<Value, ErrorDescriptor> {
  if let Some(rest) = method.strip_prefix("qt.") {
    return vocab::native::dispatch(probe, rest, params);
  }
  if let Some(rest) = method.strip_prefix("cu.") {
    return vocab::computer_use::dispatch(probe, rest, params);
  }
  if let Some(rest) = method.strip_prefix("chr.") {
    return vocab::chrome::dispatch(probe, rest, params);
  }
  Err(envelope::standard_error(
    standard::METHOD_NOT_FOUND,
    format!("unknown method: {method}"),
  ))
}

#[cfg(test)]
mod tests {
  use super::*;
  use qtmcp::Config;

  #[test]
  fn unprefixed_method_is_method_not_found() {
    let probe = Probe::new(qtmcp::Handle(1), Config::default());
    let err = dispatch(&probe, "snapshot", &Value::Null).unwrap_err();
    assert_eq!(err.code, standard::METHOD_NOT_FOUND);
  }

  #[test]
  fn malformed_json_is_parse_error() {
    let probe = Probe::new(qtmcp::Handle(1), Config::default());
    let response = handle_frame(&probe, "{not json").expect("a parse error is never a notification");
    assert_eq!(response.error.unwrap().code, standard::PARSE_ERROR);
  }

  #[test]
  fn request_without_an_id_gets_no_response() {
    let probe = Probe::new(qtmcp::Handle(1), Config::default());
    let response = handle_frame(&probe, r#"{"jsonrpc":"2.0","method":"qt.version"}"#);
    assert!(response.is_none());
  }

  #[test]
  fn request_with_a_null_id_gets_no_response() {
    let probe = Probe::new(qtmcp::Handle(1), Config::default());
    let response = handle_frame(&probe, r#"{"jsonrpc":"2.0","id":null,"method":"qt.version"}"#);
    assert!(response.is_none());
  }

  #[test]
  fn request_with_an_id_gets_a_response() {
    let probe = Probe::new(qtmcp::Handle(1), Config::default());
    let response = handle_frame(&probe, r#"{"jsonrpc":"2.0","id":1,"method":"qt.version"}"#).expect("a request with an id always gets a response");
    assert_eq!(response.id, serde_json::json!(1));
    assert!(response.result.is_some());
  }

  #[test]
  fn wrong_jsonrpc_version_is_invalid_request() {
    let probe = Probe::new(qtmcp::Handle(1), Config::default());
    let response = handle_frame(&probe, r#"{"jsonrpc":"1.0","id":1,"method":"qt.version"}"#).expect("has an id, so it gets a response");
    assert_eq!(response.error.unwrap().code, standard::INVALID_REQUEST);
  }

  #[test]
  fn missing_method_is_invalid_request_not_parse_error() {
    let probe = Probe::new(qtmcp::Handle(1), Config::default());
    let response = handle_frame(&probe, r#"{"jsonrpc":"2.0","id":1}"#).expect("has an id, so it gets a response");
    assert_eq!(response.error.unwrap().code, standard::INVALID_REQUEST);
  }
}
