//! Computer-Use (`cu.*`) vocabulary (§4.7): a single dispatch method operating in
//! logical pixels relative to the primary top-level window, mirroring the
//! coordinate-driven action set a screen-watching agent expects.

use crate::envelope::{standard, ErrorDescriptor};
use qtmcp::input::MouseButton;
use qtmcp::{ffi, input, screenshot, Probe};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Mutex;

/// Last coordinate any action moved the synthetic pointer to, in the primary
/// window's logical pixels. There is no framework call to query the real cursor
/// position through this surface, so `cursor_position` reports the last position
/// this vocabulary itself drove it to.
static LAST_CURSOR: Mutex<(f64, f64)> = Mutex::new((0.0, 0.0));

#[derive(Deserialize)]
struct DispatchParams {
  action: String,
  #[serde(default)]
  coordinate: Option<(f64, f64)>,
  #[serde(default)]
  start_coordinate: Option<(f64, f64)>,
  #[serde(default)]
  text: Option<String>,
  #[serde(default)]
  direction: Option<String>,
  #[serde(default)]
  amount: Option<i32>,
}

pub fn dispatch(_probe: &std::sync::Arc<Probe>, method: &str, params: &Value) -> Result<Value, ErrorDescriptor> {
  if method != "dispatch" {
    return Err(crate::envelope::standard_error(
      standard::METHOD_NOT_FOUND,
      format!("cu.* has a single method, cu.dispatch; got cu.{method}"),
    ));
  }
  let p: DispatchParams = super::parse_params(params)?;

  let window = primary_window()?;

  match p.action.as_str() {
    "screenshot" => {
      let image = screenshot::capture_window_logical(window.handle).map_err(crate::envelope::from_probe_error)?;
      Ok(json!(image))
    }
    "left_click" => click(&window, p.coordinate, MouseButton::Left),
    "right_click" => click(&window, p.coordinate, MouseButton::Right),
    "double_click" => double_click(&window, p.coordinate),
    "mouse_move" => mouse_move(&window, p.coordinate),
    "left_click_drag" => drag(&window, p.start_coordinate, p.coordinate),
    "type" => type_text(&window, p.text),
    "key" => key(&window, p.text),
    "scroll" => scroll(&window, p.coordinate, p.direction, p.amount),
    "cursor_position" => {
      let (x, y) = *LAST_CURSOR.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
      Ok(json!({ "x": x, "y": y }))
    }
    other => Err(crate::envelope::standard_error(
      standard::INVALID_PARAMS,
      format!("unknown cu action: {other}"),
    )),
  }
}

struct Window {
  handle: qtmcp::Handle,
  object_id: &'static str,
}

fn primary_window() -> Result<Window, ErrorDescriptor> {
  ffi::top_level_widgets()
    .into_iter()
    .next()
    .map(|handle| Window { handle, object_id: "cu-primary-window" })
    .ok_or_else(|| crate::envelope::standard_error(standard::INTERNAL_ERROR, "no top-level window is currently visible"))
}

fn require_coordinate(coordinate: Option<(f64, f64)>) -> Result<(f64, f64), ErrorDescriptor> {
  coordinate.ok_or_else(|| crate::envelope::standard_error(standard::INVALID_PARAMS, "this action requires `coordinate`"))
}

fn require_text(text: Option<String>) -> Result<String, ErrorDescriptor> {
  text.ok_or_else(|| crate::envelope::standard_error(standard::INVALID_PARAMS, "this action requires `text`"))
}

fn remember(coordinate: (f64, f64)) {
  *LAST_CURSOR.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = coordinate;
}

fn click(window: &Window, coordinate: Option<(f64, f64)>, button: MouseButton) -> Result<Value, ErrorDescriptor> {
  let (x, y) = require_coordinate(coordinate)?;
  input::click(window.handle, window.object_id, x, y, button).map_err(crate::envelope::from_probe_error)?;
  remember((x, y));
  Ok(Value::Null)
}

fn double_click(window: &Window, coordinate: Option<(f64, f64)>) -> Result<Value, ErrorDescriptor> {
  let (x, y) = require_coordinate(coordinate)?;
  input::double_click(window.handle, window.object_id, x, y).map_err(crate::envelope::from_probe_error)?;
  remember((x, y));
  Ok(Value::Null)
}

fn mouse_move(window: &Window, coordinate: Option<(f64, f64)>) -> Result<Value, ErrorDescriptor> {
  let (x, y) = require_coordinate(coordinate)?;
  input::move_to(window.handle, window.object_id, x, y).map_err(crate::envelope::from_probe_error)?;
  remember((x, y));
  Ok(Value::Null)
}

fn drag(window: &Window, start: Option<(f64, f64)>, end: Option<(f64, f64)>) -> Result<Value, ErrorDescriptor> {
  let from = require_coordinate(start)?;
  let to = require_coordinate(end)?;
  input::drag(window.handle, window.object_id, from, to, MouseButton::Left).map_err(crate::envelope::from_probe_error)?;
  remember(to);
  Ok(Value::Null)
}

fn type_text(window: &Window, text: Option<String>) -> Result<Value, ErrorDescriptor> {
  let text = require_text(text)?;
  input::type_text(window.handle, window.object_id, &text).map_err(crate::envelope::from_probe_error)?;
  Ok(Value::Null)
}

fn key(window: &Window, combo: Option<String>) -> Result<Value, ErrorDescriptor> {
  let combo = require_text(combo)?;
  input::send_key_combo(window.handle, &combo).map_err(crate::envelope::from_probe_error)?;
  Ok(Value::Null)
}

fn scroll(
  window: &Window,
  coordinate: Option<(f64, f64)>,
  direction: Option<String>,
  amount: Option<i32>,
) -> Result<Value, ErrorDescriptor> {
  let (x, y) = require_coordinate(coordinate)?;
  let amount = amount.unwrap_or(1);
  let (dx, dy) = match direction.as_deref() {
    Some("up") => (0, -amount),
    Some("down") => (0, amount),
    Some("left") => (-amount, 0),
    Some("right") => (amount, 0),
    _ => return Err(crate::envelope::standard_error(standard::INVALID_PARAMS, "scroll requires a `direction`")),
  };
  input::scroll(window.handle, window.object_id, x, y, dx, dy).map_err(crate::envelope::from_probe_error)?;
  Ok(Value::Null)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn remembers_last_cursor_position() {
    remember((12.0, 34.0));
    let (x, y) = *LAST_CURSOR.lock().unwrap();
    assert_eq!((x, y), (12.0, 34.0));
  }

  #[test]
  fn missing_coordinate_is_invalid_params() {
    let err = require_coordinate(None).unwrap_err();
    assert_eq!(err.code, standard::INVALID_PARAMS);
  }
}
