//! The three API vocabularies (§4.7): `qt.*`, `cu.*`, `chr.*`. Each module owns its
//! own method switch and is responsible for resolving object ids through the
//! registry before calling into `qtmcp`.

pub mod chrome;
pub mod computer_use;
pub mod native;

use crate::envelope::{standard, ErrorDescriptor};
use qtmcp::{Probe, ProbeError};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Deserializes `params` into `T`, turning a shape mismatch into a standard
/// JSON-RPC "invalid params" error rather than a domain error — params parsing
/// happens before any object is ever touched.
pub fn parse_params<T: DeserializeOwned>(params: &Value) -> Result<T, ErrorDescriptor> {
  serde_json::from_value(params.clone())
    .map_err(|e| crate::envelope::standard_error(standard::INVALID_PARAMS, e.to_string()))
}

/// Resolves an object-id string (any of the three id styles) through the probe's
/// registry.
pub fn resolve(probe: &Probe, id: &str) -> Result<qtmcp::Handle, ProbeError> {
  probe.registry().lock().resolve(id)
}
