//! Native (`qt.*`) vocabulary (§4.7): the ~29 reflection, mutation, and UI methods
//! every object-taking call accepts any of the three id styles for.

use super::{parse_params, resolve};
use crate::envelope::ErrorDescriptor;
use qtmcp::{meta, Probe};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub fn dispatch(probe: &Arc<Probe>, method: &str, params: &Value) -> Result<Value, ErrorDescriptor> {
  match method {
    "objects.find" => objects_find(probe, params),
    "objects.findByClass" => objects_find_by_class(probe, params),
    "objects.tree" => objects_tree(probe, params),
    "objects.info" => objects_info(probe, params),
    "objects.inspect" => objects_inspect(probe, params),
    "objects.query" => objects_query(probe, params),

    "properties.list" => properties_list(probe, params),
    "properties.get" => properties_get(probe, params),
    "properties.set" => properties_set(probe, params),

    "methods.list" => methods_list(probe, params),
    "methods.invoke" => methods_invoke(probe, params),

    "signals.list" => signals_list(probe, params),
    "signals.subscribe" => signals_subscribe(probe, params),
    "signals.unsubscribe" => signals_unsubscribe(probe, params),
    "signals.setLifecycle" => signals_set_lifecycle(probe, params),

    "ui.click" => ui_click(probe, params),
    "ui.sendKeys" => ui_send_keys(probe, params),
    "ui.screenshot" => ui_screenshot(probe, params),
    "ui.geometry" => ui_geometry(probe, params),
    "ui.hitTest" => ui_hit_test(probe, params),

    "names.register" => names_register(probe, params),
    "names.unregister" => names_unregister(probe, params),
    "names.list" => names_list(probe),
    "names.validate" => names_validate(probe, params),
    "names.load" => names_load(probe, params),
    "names.save" => names_save(probe, params),

    "ping" => ping(probe),
    "version" => version(),
    "modes" => modes(probe),

    other => Err(crate::envelope::standard_error(
      crate::envelope::standard::METHOD_NOT_FOUND,
      format!("unknown qt.* method: {other}"),
    )),
  }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdParams {
  #[serde(alias = "objectId")]
  id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FindParams {
  name: String,
  #[serde(default)]
  root: Option<String>,
}

fn objects_find(probe: &Probe, params: &Value) -> Result<Value, ErrorDescriptor> {
  let p: FindParams = parse_params(params)?;
  let mut registry = probe.registry().lock();
  let root = p.root.as_deref().map(|r| registry.resolve(r)).transpose().map_err(crate::envelope::from_probe_error)?;
  let handle = registry
    .find_by_name(&p.name, root)
    .ok_or_else(|| crate::envelope::from_probe_error(qtmcp::ProbeError::ObjectNotFound { id: p.name.clone() }))?;
  let object_id = registry.hierarchical_id(handle);
  let snap = qtmcp::ffi::snapshot(handle);
  Ok(json!({
    "objectId": object_id,
    "className": snap.class_chain.first().cloned().unwrap_or_default(),
  }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FindByClassParams {
  class_name: String,
  #[serde(default)]
  root: Option<String>,
}

fn objects_find_by_class(probe: &Probe, params: &Value) -> Result<Value, ErrorDescriptor> {
  let p: FindByClassParams = parse_params(params)?;
  let mut registry = probe.registry().lock();
  let root = p.root.as_deref().map(|r| registry.resolve(r)).transpose().map_err(crate::envelope::from_probe_error)?;
  let handles = registry.find_all_by_class(&p.class_name, root);
  let ids: Vec<String> = handles.into_iter().map(|h| registry.hierarchical_id(h)).collect();
  Ok(json!(ids))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TreeParams {
  #[serde(default)]
  root: Option<String>,
  #[serde(default)]
  max_depth: Option<usize>,
}

fn objects_tree(probe: &Probe, params: &Value) -> Result<Value, ErrorDescriptor> {
  let p: TreeParams = parse_params(params)?;
  let mut registry = probe.registry().lock();
  let root = match p.root {
    Some(id) => registry.resolve(&id).map_err(crate::envelope::from_probe_error)?,
    None => registry.application(),
  };
  let tree = registry.serialize_tree(root, p.max_depth);
  serde_json::to_value(tree).map_err(|e| crate::envelope::standard_error(crate::envelope::standard::INTERNAL_ERROR, e.to_string()))
}

fn objects_info(probe: &Probe, params: &Value) -> Result<Value, ErrorDescriptor> {
  let p: IdParams = parse_params(params)?;
  let handle = resolve(probe, &p.id).map_err(crate::envelope::from_probe_error)?;
  let mut registry = probe.registry().lock();
  let snap = qtmcp::ffi::snapshot(handle);
  Ok(json!({
    "objectId": registry.hierarchical_id(handle),
    "numericId": registry.numeric_ref_for(handle).0,
    "className": snap.class_chain.first().cloned().unwrap_or_default(),
    "classChain": snap.class_chain,
    "objectName": snap.object_name,
    "isWidget": qtmcp::ffi::is_widget(handle),
  }))
}

fn objects_inspect(probe: &Probe, params: &Value) -> Result<Value, ErrorDescriptor> {
  let p: IdParams = parse_params(params)?;
  let handle = resolve(probe, &p.id).map_err(crate::envelope::from_probe_error)?;
  Ok(json!({
    "properties": meta::list_properties(handle),
    "methods": meta::list_methods(handle),
    "signals": meta::list_signals(handle),
  }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryParams {
  #[serde(default)]
  class_name: Option<String>,
  #[serde(default)]
  properties: std::collections::HashMap<String, Value>,
  #[serde(default)]
  root: Option<String>,
}

/// Exact-match only: every listed property must equal the given value via JSON
/// equality, never a substring/range/regex match.
fn objects_query(probe: &Probe, params: &Value) -> Result<Value, ErrorDescriptor> {
  let p: QueryParams = parse_params(params)?;
  let mut registry = probe.registry().lock();
  let root = p.root.as_deref().map(|r| registry.resolve(r)).transpose().map_err(crate::envelope::from_probe_error)?;
  let candidates = match &p.class_name {
    Some(class_name) => registry.find_all_by_class(class_name, root),
    None => registry.find_all_by_class("QObject", root),
  };

  let matches: Vec<String> = candidates
    .into_iter()
    .filter(|&handle| {
      p.properties.iter().all(|(name, expected)| {
        meta::get_property(handle, name).map(|actual| &actual == expected).unwrap_or(false)
      })
    })
    .map(|h| registry.hierarchical_id(h))
    .collect();
  Ok(json!(matches))
}

fn properties_list(probe: &Probe, params: &Value) -> Result<Value, ErrorDescriptor> {
  let p: IdParams = parse_params(params)?;
  let handle = resolve(probe, &p.id).map_err(crate::envelope::from_probe_error)?;
  serde_json::to_value(meta::list_properties(handle)).map_err(|e| crate::envelope::standard_error(crate::envelope::standard::INTERNAL_ERROR, e.to_string()))
}

#[derive(Deserialize)]
struct PropertyGetParams {
  #[serde(alias = "objectId")]
  id: String,
  name: String,
}

fn properties_get(probe: &Probe, params: &Value) -> Result<Value, ErrorDescriptor> {
  let p: PropertyGetParams = parse_params(params)?;
  let handle = resolve(probe, &p.id).map_err(crate::envelope::from_probe_error)?;
  let value = meta::get_property(handle, &p.name).map_err(crate::envelope::from_probe_error)?;
  Ok(json!({ "value": value }))
}

#[derive(Deserialize)]
struct PropertySetParams {
  #[serde(alias = "objectId")]
  id: String,
  name: String,
  value: Value,
}

fn properties_set(probe: &Probe, params: &Value) -> Result<Value, ErrorDescriptor> {
  let p: PropertySetParams = parse_params(params)?;
  let handle = resolve(probe, &p.id).map_err(crate::envelope::from_probe_error)?;
  meta::set_property(handle, &p.name, &p.value).map_err(crate::envelope::from_probe_error)?;
  Ok(Value::Null)
}

fn methods_list(probe: &Probe, params: &Value) -> Result<Value, ErrorDescriptor> {
  let p: IdParams = parse_params(params)?;
  let handle = resolve(probe, &p.id).map_err(crate::envelope::from_probe_error)?;
  serde_json::to_value(meta::list_methods(handle)).map_err(|e| crate::envelope::standard_error(crate::envelope::standard::INTERNAL_ERROR, e.to_string()))
}

#[derive(Deserialize)]
struct MethodInvokeParams {
  id: String,
  name: String,
  #[serde(default)]
  args: Vec<Value>,
}

fn methods_invoke(probe: &Probe, params: &Value) -> Result<Value, ErrorDescriptor> {
  let p: MethodInvokeParams = parse_params(params)?;
  let handle = resolve(probe, &p.id).map_err(crate::envelope::from_probe_error)?;
  meta::invoke_method(handle, &p.name, &p.args).map_err(crate::envelope::from_probe_error)
}

fn signals_list(probe: &Probe, params: &Value) -> Result<Value, ErrorDescriptor> {
  let p: IdParams = parse_params(params)?;
  let handle = resolve(probe, &p.id).map_err(crate::envelope::from_probe_error)?;
  serde_json::to_value(meta::list_signals(handle)).map_err(|e| crate::envelope::standard_error(crate::envelope::standard::INTERNAL_ERROR, e.to_string()))
}

#[derive(Deserialize)]
struct SignalSubscribeParams {
  id: String,
  signal: String,
}

fn signals_subscribe(probe: &Probe, params: &Value) -> Result<Value, ErrorDescriptor> {
  let p: SignalSubscribeParams = parse_params(params)?;
  let handle = resolve(probe, &p.id).map_err(crate::envelope::from_probe_error)?;
  let object_id = probe.registry().lock().hierarchical_id(handle);
  let subscription_id = probe
    .signals()
    .subscribe_signal(object_id, handle, &p.signal)
    .map_err(crate::envelope::from_probe_error)?;
  Ok(json!({ "subscriptionId": subscription_id }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignalUnsubscribeParams {
  subscription_id: String,
}

fn signals_unsubscribe(probe: &Probe, params: &Value) -> Result<Value, ErrorDescriptor> {
  let p: SignalUnsubscribeParams = parse_params(params)?;
  probe.signals().unsubscribe(&p.subscription_id).map_err(crate::envelope::from_probe_error)?;
  Ok(Value::Null)
}

#[derive(Deserialize)]
struct LifecycleParams {
  enabled: bool,
}

fn signals_set_lifecycle(probe: &Probe, params: &Value) -> Result<Value, ErrorDescriptor> {
  let p: LifecycleParams = parse_params(params)?;
  probe.signals().set_lifecycle_enabled(p.enabled);
  Ok(Value::Null)
}

#[derive(Deserialize)]
struct ClickParams {
  id: String,
  x: f64,
  y: f64,
  #[serde(default)]
  button: Option<String>,
}

fn button_from_name(name: Option<&str>) -> qtmcp::input::MouseButton {
  match name.map(str::to_ascii_lowercase).as_deref() {
    Some("right") => qtmcp::input::MouseButton::Right,
    Some("middle") => qtmcp::input::MouseButton::Middle,
    _ => qtmcp::input::MouseButton::Left,
  }
}

fn ui_click(probe: &Probe, params: &Value) -> Result<Value, ErrorDescriptor> {
  let p: ClickParams = parse_params(params)?;
  let handle = resolve(probe, &p.id).map_err(crate::envelope::from_probe_error)?;
  qtmcp::input::click(handle, &p.id, p.x, p.y, button_from_name(p.button.as_deref())).map_err(crate::envelope::from_probe_error)?;
  Ok(Value::Null)
}

#[derive(Deserialize)]
struct SendKeysParams {
  id: String,
  #[serde(default)]
  combo: Option<String>,
  #[serde(default)]
  text: Option<String>,
}

fn ui_send_keys(probe: &Probe, params: &Value) -> Result<Value, ErrorDescriptor> {
  let p: SendKeysParams = parse_params(params)?;
  let handle = resolve(probe, &p.id).map_err(crate::envelope::from_probe_error)?;
  if let Some(text) = p.text {
    qtmcp::input::type_text(handle, &p.id, &text).map_err(crate::envelope::from_probe_error)?;
  } else if let Some(combo) = p.combo {
    qtmcp::input::send_key_combo(handle, &combo).map_err(crate::envelope::from_probe_error)?;
  } else {
    return Err(crate::envelope::standard_error(
      crate::envelope::standard::INVALID_PARAMS,
      "ui.sendKeys requires either `combo` or `text`",
    ));
  }
  Ok(Value::Null)
}

#[derive(Deserialize)]
struct ScreenshotParams {
  id: String,
  #[serde(default)]
  mode: Option<String>,
  #[serde(default)]
  x: f64,
  #[serde(default)]
  y: f64,
  #[serde(default)]
  width: f64,
  #[serde(default)]
  height: f64,
}

fn ui_screenshot(probe: &Probe, params: &Value) -> Result<Value, ErrorDescriptor> {
  let p: ScreenshotParams = parse_params(params)?;
  let handle = resolve(probe, &p.id).map_err(crate::envelope::from_probe_error)?;
  let png_base64 = match p.mode.as_deref() {
    Some("window") => qtmcp::screenshot::capture_window(handle),
    Some("window_logical") => qtmcp::screenshot::capture_window_logical(handle),
    Some("region") => qtmcp::screenshot::capture_region(handle, p.x, p.y, p.width, p.height),
    Some("screen") => qtmcp::screenshot::capture_screen(handle),
    _ => qtmcp::screenshot::capture_widget(handle),
  }
  .map_err(crate::envelope::from_probe_error)?;
  Ok(json!({ "image": png_base64, "format": "png" }))
}

fn ui_geometry(probe: &Probe, params: &Value) -> Result<Value, ErrorDescriptor> {
  let p: IdParams = parse_params(params)?;
  let handle = resolve(probe, &p.id).map_err(crate::envelope::from_probe_error)?;
  Ok(qtmcp::meta::variant::geometry_to_json(qtmcp::ffi::read_property(handle, "geometry")))
}

#[derive(Deserialize)]
struct HitTestParams {
  x: f64,
  y: f64,
}

fn ui_hit_test(probe: &Probe, params: &Value) -> Result<Value, ErrorDescriptor> {
  let p: HitTestParams = parse_params(params)?;
  let mut registry = probe.registry().lock();
  Ok(match qtmcp::input::hit_test_global(p.x, p.y) {
    Some(handle) => json!(registry.hierarchical_id(handle)),
    None => Value::Null,
  })
}

#[derive(Deserialize)]
struct NameRegisterParams {
  name: String,
  id: String,
  #[serde(default)]
  overwrite: bool,
}

fn names_register(probe: &Probe, params: &Value) -> Result<Value, ErrorDescriptor> {
  let p: NameRegisterParams = parse_params(params)?;
  probe
    .registry()
    .lock()
    .names
    .register(&p.name, &p.id, p.overwrite)
    .map_err(qtmcp::ProbeError::from)
    .map_err(crate::envelope::from_probe_error)?;
  Ok(Value::Null)
}

#[derive(Deserialize)]
struct NameParams {
  name: String,
}

fn names_unregister(probe: &Probe, params: &Value) -> Result<Value, ErrorDescriptor> {
  let p: NameParams = parse_params(params)?;
  probe
    .registry()
    .lock()
    .names
    .unregister(&p.name)
    .map_err(qtmcp::ProbeError::from)
    .map_err(crate::envelope::from_probe_error)?;
  Ok(Value::Null)
}

fn names_list(probe: &Probe) -> Result<Value, ErrorDescriptor> {
  Ok(json!(probe.registry().lock().names.list()))
}

fn names_validate(probe: &Probe, params: &Value) -> Result<Value, ErrorDescriptor> {
  let p: NameParams = parse_params(params)?;
  let mut registry = probe.registry().lock();
  let expanded = registry.names.expand(&p.name);
  let resolves = match expanded {
    Some(hierarchical_id) => registry.resolve(&hierarchical_id).is_ok(),
    None => false,
  };
  Ok(json!({ "valid": resolves }))
}

#[derive(Deserialize)]
struct PathParams {
  #[serde(default)]
  path: Option<String>,
}

fn names_load(probe: &Probe, params: &Value) -> Result<Value, ErrorDescriptor> {
  let p: PathParams = parse_params(params)?;
  let path = p.path.map(std::path::PathBuf::from).unwrap_or_else(|| probe.config().name_map_path.clone());
  let loaded = qtmcp::registry::names::NameMap::load(&path)
    .map_err(qtmcp::ProbeError::from)
    .map_err(crate::envelope::from_probe_error)?;
  probe.registry().lock().names = loaded;
  Ok(Value::Null)
}

fn names_save(probe: &Probe, params: &Value) -> Result<Value, ErrorDescriptor> {
  let p: PathParams = parse_params(params)?;
  let path = p.path.map(std::path::PathBuf::from).unwrap_or_else(|| probe.config().name_map_path.clone());
  probe
    .registry()
    .lock()
    .names
    .save(&path)
    .map_err(qtmcp::ProbeError::from)
    .map_err(crate::envelope::from_probe_error)?;
  Ok(Value::Null)
}

/// Posts a null event and times the round trip through the event loop. Runs
/// synchronously on the dispatch thread rather than through the FFI's async
/// ping/pong callback, since the dispatch thread already owns the Qt main thread
/// for the duration of this call.
fn ping(_probe: &Probe) -> Result<Value, ErrorDescriptor> {
  let start = std::time::Instant::now();
  qtmcp::ffi::process_events_once();
  Ok(json!({
    "pong": true,
    "eventLoopLatencyMs": start.elapsed().as_secs_f64() * 1000.0,
  }))
}

fn version() -> Result<Value, ErrorDescriptor> {
  let (major, minor, patch) = qtmcp::ffi::qt_version();
  Ok(json!({
    "qtVersion": format!("{major}.{minor}.{patch}"),
    "probeVersion": env!("CARGO_PKG_VERSION"),
  }))
}

fn modes(probe: &Probe) -> Result<Value, ErrorDescriptor> {
  let mode = probe.config().mode;
  Ok(json!({
    "native": mode.includes_native(),
    "computerUse": mode.includes_computer_use(),
    "chrome": mode.includes_chrome(),
  }))
}
