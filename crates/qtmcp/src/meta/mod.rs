/*!
Meta-inspection (§4.3): properties, methods, signals over the framework's compiled-in
reflection, plus the variant↔JSON boundary in [`variant`].
*/

pub mod variant;

use crate::error::{ProbeError, ProbeResult};
use crate::ffi::{self, Handle};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
pub struct PropertyInfo {
  pub name: String,
  pub declared_type: String,
  pub value: Value,
  pub writable: bool,
  pub resettable: bool,
  pub stored: bool,
  pub notify_signal: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MethodParamInfo {
  pub name: String,
  #[serde(rename = "type")]
  pub type_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MethodInfo {
  pub name: String,
  pub params: Vec<MethodParamInfo>,
  pub return_type: String,
  pub is_slot: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignalInfo {
  pub name: String,
  pub params: Vec<MethodParamInfo>,
}

pub fn list_properties(handle: Handle) -> Vec<PropertyInfo> {
  ffi::list_properties(handle)
    .into_iter()
    .map(|p| PropertyInfo {
      value: variant::to_json(&ffi::read_property(handle, &p.name)),
      name: p.name,
      declared_type: p.type_name,
      writable: p.writable,
      resettable: p.resettable,
      stored: p.stored,
      notify_signal: (!p.notify_signal.is_empty()).then_some(p.notify_signal),
    })
    .collect()
}

pub fn get_property(handle: Handle, name: &str) -> ProbeResult<Value> {
  find_property_meta(handle, name)?;
  Ok(variant::to_json(&ffi::read_property(handle, name)))
}

pub fn set_property(handle: Handle, name: &str, value: &Value) -> ProbeResult<()> {
  let meta = find_property_meta(handle, name)?;
  if !meta.writable {
    return Err(ProbeError::PropertyReadOnly {
      name: name.to_string(),
    });
  }
  let raw = variant::from_json(value, &meta.type_name).ok_or_else(|| ProbeError::PropertyTypeMismatch {
    name: name.to_string(),
    expected: meta.type_name.clone(),
  })?;
  if ffi::write_property(handle, name, raw.clone()) {
    return Ok(());
  }
  // Direct assignment refused: ask the framework to convert to the declared
  // type-id explicitly and retry once before giving up.
  if ffi::write_property_converted(handle, name, raw, &meta.type_name) {
    Ok(())
  } else {
    Err(ProbeError::PropertyTypeMismatch {
      name: name.to_string(),
      expected: meta.type_name,
    })
  }
}

fn find_property_meta(handle: Handle, name: &str) -> ProbeResult<ffi::PropertyMeta> {
  let properties = ffi::list_properties(handle);
  let available: Vec<String> = properties.iter().map(|p| p.name.clone()).collect();
  properties
    .into_iter()
    .find(|p| p.name == name)
    .ok_or_else(|| ProbeError::PropertyNotFound {
      name: name.to_string(),
      available,
    })
}

pub fn list_methods(handle: Handle) -> Vec<MethodInfo> {
  ffi::list_methods(handle)
    .into_iter()
    .map(|m| MethodInfo {
      name: m.name,
      params: m
        .params
        .into_iter()
        .map(|p| MethodParamInfo {
          name: p.name,
          type_name: p.type_name,
        })
        .collect(),
      return_type: m.return_type,
      is_slot: m.is_slot,
    })
    .collect()
}

pub fn invoke_method(handle: Handle, name: &str, args: &[Value]) -> ProbeResult<Value> {
  let methods = ffi::list_methods(handle);
  let candidates: Vec<&ffi::MethodMeta> = methods.iter().filter(|m| m.name == name).collect();
  if candidates.is_empty() {
    return Err(ProbeError::MethodNotFound {
      name: name.to_string(),
      available: methods.iter().map(|m| m.name.clone()).collect(),
    });
  }

  let overload = candidates
    .iter()
    .find(|m| m.params.len() == args.len())
    .ok_or_else(|| ProbeError::MethodArgumentMismatch {
      name: name.to_string(),
      candidates: candidates.iter().map(signature_of).collect(),
    })?;

  let mut raw_args = Vec::with_capacity(args.len());
  for (param, value) in overload.params.iter().zip(args) {
    let raw = variant::from_json(value, &param.type_name).ok_or_else(|| ProbeError::MethodArgumentMismatch {
      name: name.to_string(),
      candidates: candidates.iter().map(signature_of).collect(),
    })?;
    raw_args.push(raw);
  }

  let result = ffi::invoke_method(handle, name, &raw_args).map_err(|reason| ProbeError::MethodInvocationFailed {
    name: name.to_string(),
    reason,
  })?;
  Ok(variant::to_json(&result))
}

fn signature_of(method: &&ffi::MethodMeta) -> String {
  let params = method
    .params
    .iter()
    .map(|p| p.type_name.as_str())
    .collect::<Vec<_>>()
    .join(", ");
  format!("{}({params})", method.name)
}

pub fn list_signals(handle: Handle) -> Vec<SignalInfo> {
  ffi::list_signals(handle)
    .into_iter()
    .map(|s| SignalInfo {
      name: s.name,
      params: s
        .params
        .into_iter()
        .map(|p| MethodParamInfo {
          name: p.name,
          type_name: p.type_name,
        })
        .collect(),
    })
    .collect()
}

pub(crate) fn find_signal_meta_index(handle: Handle, name: &str) -> ProbeResult<i32> {
  ffi::list_signals(handle)
    .into_iter()
    .find(|s| s.name == name)
    .map(|s| s.meta_index)
    .ok_or_else(|| ProbeError::SignalNotFound {
      name: name.to_string(),
    })
}
