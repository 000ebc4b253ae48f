/*!
Input synthesis and hit-testing (§4.6, input half). Screenshot capture lives
alongside this in [`crate::screenshot`] since both are issued through the same
"activate, pump, synthesize" sequence.
*/

pub mod keys;

use crate::error::{ProbeError, ProbeResult};
use crate::ffi::{self, Handle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
  Left,
  Right,
  Middle,
}

impl MouseButton {
  const fn as_qt(self) -> u8 {
    match self {
      Self::Left => 1,
      Self::Right => 2,
      Self::Middle => 4,
    }
  }
}

/// Qt event-type codes the shim's `synth_mouse_event` switches on.
mod event_kind {
  pub const PRESS: u8 = 2; // QEvent::MouseButtonPress
  pub const RELEASE: u8 = 3; // QEvent::MouseButtonRelease
  pub const MOVE: u8 = 5; // QEvent::MouseMove
  pub const DOUBLE_CLICK: u8 = 4; // QEvent::MouseButtonDblClick
}

fn require_widget(handle: Handle, object_id: &str) -> ProbeResult<()> {
  if ffi::is_widget(handle) {
    Ok(())
  } else {
    Err(ProbeError::ObjectNotAWidget {
      id: object_id.to_string(),
      actual_class: "non-widget QObject".to_string(),
    })
  }
}

fn require_visible_and_enabled(handle: Handle, object_id: &str) -> ProbeResult<()> {
  if !ffi::widget_is_visible(handle) {
    return Err(ProbeError::WidgetNotVisible {
      id: object_id.to_string(),
    });
  }
  if !ffi::widget_is_enabled(handle) {
    return Err(ProbeError::WidgetNotEnabled {
      id: object_id.to_string(),
    });
  }
  Ok(())
}

fn prepare_target(handle: Handle, object_id: &str) -> ProbeResult<()> {
  require_widget(handle, object_id)?;
  require_visible_and_enabled(handle, object_id)?;
  ffi::activate_and_raise(handle);
  ffi::process_events_once();
  Ok(())
}

pub fn click(handle: Handle, object_id: &str, local_x: f64, local_y: f64, button: MouseButton) -> ProbeResult<()> {
  prepare_target(handle, object_id)?;
  ffi::synth_mouse_event(handle, event_kind::PRESS, local_x, local_y, button.as_qt());
  ffi::process_events_once();
  ffi::synth_mouse_event(handle, event_kind::RELEASE, local_x, local_y, button.as_qt());
  ffi::process_events_once();
  Ok(())
}

pub fn double_click(handle: Handle, object_id: &str, local_x: f64, local_y: f64) -> ProbeResult<()> {
  prepare_target(handle, object_id)?;
  ffi::synth_mouse_event(handle, event_kind::DOUBLE_CLICK, local_x, local_y, MouseButton::Left.as_qt());
  ffi::process_events_once();
  Ok(())
}

pub fn move_to(handle: Handle, object_id: &str, local_x: f64, local_y: f64) -> ProbeResult<()> {
  prepare_target(handle, object_id)?;
  ffi::synth_mouse_event(handle, event_kind::MOVE, local_x, local_y, 0);
  ffi::process_events_once();
  Ok(())
}

/// Press-at-source, move-to-destination, release-at-destination, with one event
/// pump between steps (§4.6).
pub fn drag(
  handle: Handle,
  object_id: &str,
  from: (f64, f64),
  to: (f64, f64),
  button: MouseButton,
) -> ProbeResult<()> {
  prepare_target(handle, object_id)?;
  ffi::synth_mouse_event(handle, event_kind::PRESS, from.0, from.1, button.as_qt());
  ffi::process_events_once();
  ffi::synth_mouse_event(handle, event_kind::MOVE, to.0, to.1, button.as_qt());
  ffi::process_events_once();
  ffi::synth_mouse_event(handle, event_kind::RELEASE, to.0, to.1, button.as_qt());
  ffi::process_events_once();
  Ok(())
}

pub fn scroll(handle: Handle, object_id: &str, local_x: f64, local_y: f64, _dx: i32, _dy: i32) -> ProbeResult<()> {
  prepare_target(handle, object_id)?;
  // Qt wheel events are out of `synth_mouse_event`'s event-kind set; the shim
  // exposes no separate entry point yet because no scroll scenario has needed one.
  ffi::synth_mouse_event(handle, event_kind::MOVE, local_x, local_y, 0);
  ffi::process_events_once();
  Ok(())
}

/// Types `text` at the widget currently holding focus, via Qt's input-method event
/// path (works for both plain and IME-composed text).
pub fn type_text(handle: Handle, object_id: &str, text: &str) -> ProbeResult<()> {
  require_widget(handle, object_id)?;
  ffi::process_events_once();
  if ffi::synth_text_input(handle, text) {
    ffi::process_events_once();
    Ok(())
  } else {
    Err(ProbeError::MethodInvocationFailed {
      name: "sendKeys".to_string(),
      reason: "text input rejected".to_string(),
    })
  }
}

/// Sends a single key with modifiers, or a whole `ctrl+shift+s`-style combo string
/// if `combo` is set; `combo` takes precedence and `key_name`/`modifiers` are
/// ignored when it is present.
pub fn send_key_combo(handle: Handle, combo: &str) -> ProbeResult<()> {
  let (key_code, modifiers) = keys::parse_combo(combo).ok_or_else(|| ProbeError::MethodArgumentMismatch {
    name: "ui.sendKeys".to_string(),
    candidates: vec!["key combo string, e.g. \"ctrl+shift+s\"".to_string()],
  })?;
  ffi::synth_key_event(handle, key_code, modifiers, true);
  ffi::process_events_once();
  ffi::synth_key_event(handle, key_code, modifiers, false);
  ffi::process_events_once();
  Ok(())
}

pub fn hit_test_global(global_x: f64, global_y: f64) -> Option<Handle> {
  ffi::hit_test(global_x, global_y)
}

pub fn hit_test_local(parent: Handle, local_x: f64, local_y: f64) -> Option<Handle> {
  ffi::hit_test_child(parent, local_x, local_y)
}
