/*!
Accessibility tree and ephemeral refs (§4.8), backing the Chrome (`chr.*`) vocabulary.
Every `read_page` rebuilds the tree from scratch and hands out a fresh ref→handle
map; refs from an earlier build are rejected with [`ProbeError::RefExpired`] rather
than silently resolving to whatever now occupies that slot.

# Module structure

- `mod.rs` — tree construction, ref resolution, the `click`/`form_input`/
  `get_page_text`/`find`/`tabs_context` operations.
- `role.rs` — the widget-class→role table.
- `console.rs` — the message-capture ring buffer behind `read_console_messages`.
*/

pub mod console;
pub mod role;

use crate::error::{ProbeError, ProbeResult};
use crate::ffi::{self, Handle, ObjectSnapshot, RawVariant, VariantKind};
use crate::input::{self, MouseButton};
use crate::meta::variant;
use crate::registry::Registry;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize)]
pub struct AccessibilityNode {
  #[serde(rename = "ref")]
  pub ref_id: u32,
  pub role: &'static str,
  pub label: String,
  pub geometry: Value,
  pub interactable: bool,
  pub value: Option<Value>,
  pub children: Vec<AccessibilityNode>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TabInfo {
  pub id: String,
  pub title: String,
  pub active: bool,
  pub size: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct FindMatch {
  #[serde(rename = "ref")]
  pub ref_id: u32,
  pub label: String,
  pub confidence: f64,
}

struct Built {
  ref_to_handle: HashMap<u32, Handle>,
  /// `(ref, label)` in traversal order, reused by `get_page_text` and `find` so
  /// they stay consistent with whatever `read_page` last actually emitted.
  flat: Vec<(u32, String)>,
}

/// Owns the last-built ref map. One instance per probe; `read_page` replaces
/// `built` wholesale rather than mutating it in place.
pub struct AccessibilityTree {
  next_ref: Mutex<u32>,
  built: Mutex<Option<Built>>,
}

impl AccessibilityTree {
  pub fn new() -> Self {
    Self {
      next_ref: Mutex::new(1),
      built: Mutex::new(None),
    }
  }

  pub fn read_page(&self, include_invisible: bool) -> Vec<AccessibilityNode> {
    *self.next_ref.lock() = 1;
    let mut ref_to_handle = HashMap::new();
    let mut flat = Vec::new();
    let nodes = ffi::top_level_widgets()
      .into_iter()
      .filter_map(|h| self.build_node(h, include_invisible, &mut ref_to_handle, &mut flat))
      .collect();
    *self.built.lock() = Some(Built { ref_to_handle, flat });
    nodes
  }

  fn build_node(
    &self,
    handle: Handle,
    include_invisible: bool,
    ref_to_handle: &mut HashMap<u32, Handle>,
    flat: &mut Vec<(u32, String)>,
  ) -> Option<AccessibilityNode> {
    let is_widget = ffi::is_widget(handle);
    let visible = !is_widget || ffi::widget_is_visible(handle);
    if !visible && !include_invisible {
      return None;
    }

    let snap = ffi::snapshot(handle);
    let (role, _flags) = role::resolve(&snap.class_chain);
    let label = label_for(handle, &snap);
    let geometry = if is_widget {
      variant::geometry_to_json(ffi::read_property(handle, "geometry"))
    } else {
      Value::Null
    };
    let enabled = !is_widget || ffi::widget_is_enabled(handle);
    let interactable = visible && enabled && role.is_interactable();
    let value = editable_value(handle, &snap);

    let children = snap
      .child_handles
      .into_iter()
      .map(Handle)
      .filter_map(|child| self.build_node(child, include_invisible, ref_to_handle, flat))
      .collect();

    let ref_id = {
      let mut next = self.next_ref.lock();
      let id = *next;
      *next += 1;
      id
    };
    ref_to_handle.insert(ref_id, handle);
    flat.push((ref_id, label.clone()));

    Some(AccessibilityNode {
      ref_id,
      role: role.as_str(),
      label,
      geometry,
      interactable,
      value,
      children,
    })
  }

  fn resolve_ref(&self, ref_id: u32) -> ProbeResult<Handle> {
    self
      .built
      .lock()
      .as_ref()
      .and_then(|b| b.ref_to_handle.get(&ref_id).copied())
      .ok_or(ProbeError::RefExpired { ref_id })
  }

  pub fn click(&self, ref_id: u32, button: MouseButton) -> ProbeResult<()> {
    let handle = self.resolve_ref(ref_id)?;
    let (local_x, local_y) = center_of_widget(handle);
    input::click(handle, &ref_id.to_string(), local_x, local_y, button)
  }

  /// Dispatches on the widget's concrete class (§4.8): checkboxes/radios derive a
  /// checked state from a truthy conversion, sliders/spinboxes set `value`, combo
  /// boxes set `currentText`, and text widgets both set `text` and replay the
  /// value through synthetic key input so IME- and validator-sensitive widgets see
  /// the same path a real user would drive.
  pub fn form_input(&self, ref_id: u32, value: &Value) -> ProbeResult<()> {
    let handle = self.resolve_ref(ref_id)?;
    let object_id = ref_id.to_string();
    let snap = ffi::snapshot(handle);
    let class_name = snap.class_chain.first().map(String::as_str).unwrap_or("");

    match class_name {
      "QCheckBox" | "QRadioButton" => {
        ffi::write_property(handle, "checked", bool_variant(truthy(value)));
      }
      "QComboBox" => {
        ffi::write_property(handle, "currentText", string_variant(value_as_text(value)));
      }
      "QSlider" | "QDial" | "QSpinBox" | "QDoubleSpinBox" => {
        crate::meta::set_property(handle, "value", value)?;
      }
      "QLineEdit" | "QTextEdit" | "QPlainTextEdit" => {
        let text = value_as_text(value);
        ffi::write_property(handle, "text", string_variant(text.clone()));
        input::type_text(handle, &object_id, &text)?;
      }
      _ => {
        ffi::write_property(handle, "text", string_variant(value_as_text(value)));
      }
    }
    ffi::process_events_once();
    Ok(())
  }

  pub fn get_page_text(&self) -> String {
    self
      .built
      .lock()
      .as_ref()
      .map(|b| {
        b.flat
          .iter()
          .map(|(_, label)| label.as_str())
          .filter(|label| !label.is_empty())
          .collect::<Vec<_>>()
          .join("\n")
      })
      .unwrap_or_default()
  }

  /// Case-insensitive substring and token matching (§4.8) over the labels from the
  /// last `read_page`. Exact matches rank highest, substring matches next, partial
  /// token overlap last; callers should treat the score as a ranking hint, not a
  /// probability.
  pub fn find(&self, query: &str) -> Vec<FindMatch> {
    let query_lower = query.to_ascii_lowercase();
    let tokens: Vec<&str> = query_lower.split_whitespace().collect();
    let guard = self.built.lock();
    let Some(built) = guard.as_ref() else {
      return Vec::new();
    };

    let mut matches: Vec<FindMatch> = built
      .flat
      .iter()
      .filter_map(|(ref_id, label)| {
        let label_lower = label.to_ascii_lowercase();
        if label_lower.is_empty() {
          return None;
        }
        let confidence = if label_lower == query_lower {
          1.0
        } else if label_lower.contains(&query_lower) {
          0.85
        } else {
          let hit_count = tokens.iter().filter(|t| label_lower.contains(**t)).count();
          if hit_count == 0 {
            return None;
          }
          0.5 * (hit_count as f64 / tokens.len().max(1) as f64)
        };
        Some(FindMatch {
          ref_id: *ref_id,
          label: label.clone(),
          confidence,
        })
      })
      .collect();

    matches.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));
    matches
  }

  pub fn tabs_context(&self, registry: &mut Registry) -> Vec<TabInfo> {
    ffi::top_level_widgets()
      .into_iter()
      .map(|handle| {
        let snap = ffi::snapshot(handle);
        let active = variant::to_json(&ffi::read_property(handle, "isActiveWindow"))
          .as_bool()
          .unwrap_or(false);
        TabInfo {
          id: registry.hierarchical_id(handle),
          title: label_for(handle, &snap),
          active,
          size: variant::geometry_to_json(ffi::read_property(handle, "geometry")),
        }
      })
      .collect()
  }

  /// Activates and raises a top-level window by handle; the closest desktop
  /// analogue to Chrome's tab navigation, since there is no page concept here.
  pub fn navigate(&self, handle: Handle) {
    ffi::activate_and_raise(handle);
    ffi::process_events_once();
  }
}

impl Default for AccessibilityTree {
  fn default() -> Self {
    Self::new()
  }
}

fn label_for(handle: Handle, snap: &ObjectSnapshot) -> String {
  for property_name in ["windowTitle", "text", "title", "labelText"] {
    let raw = ffi::read_property(handle, property_name);
    if raw.is_valid {
      if let Value::String(s) = variant::to_json(&raw) {
        if !s.is_empty() {
          return s;
        }
      }
    }
  }
  snap.object_name.clone()
}

fn editable_value(handle: Handle, snap: &ObjectSnapshot) -> Option<Value> {
  let class_name = snap.class_chain.first().map(String::as_str).unwrap_or("");
  let property_name = match class_name {
    "QCheckBox" | "QRadioButton" => "checked",
    "QSlider" | "QDial" | "QSpinBox" | "QDoubleSpinBox" => "value",
    "QComboBox" => "currentText",
    "QLineEdit" | "QTextEdit" | "QPlainTextEdit" => "text",
    _ => return None,
  };
  let raw = ffi::read_property(handle, property_name);
  raw.is_valid.then(|| variant::to_json(&raw))
}

fn center_of_widget(handle: Handle) -> (f64, f64) {
  let geometry = variant::geometry_to_json(ffi::read_property(handle, "geometry"));
  let width = geometry.get("width").and_then(Value::as_f64).unwrap_or(0.0);
  let height = geometry.get("height").and_then(Value::as_f64).unwrap_or(0.0);
  (width / 2.0, height / 2.0)
}

fn truthy(value: &Value) -> bool {
  match value {
    Value::Bool(b) => *b,
    Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
    Value::String(s) => !s.is_empty() && !matches!(s.to_ascii_lowercase().as_str(), "false" | "0" | "no"),
    Value::Null => false,
    Value::Array(a) => !a.is_empty(),
    Value::Object(o) => !o.is_empty(),
  }
}

fn value_as_text(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    other => other.to_string(),
  }
}

fn bool_variant(b: bool) -> RawVariant {
  RawVariant {
    is_valid: true,
    kind: VariantKind::Bool,
    i: 0,
    f: 0.0,
    b,
    s: String::new(),
    bytes: Vec::new(),
    object_id: 0,
  }
}

fn string_variant(s: String) -> RawVariant {
  RawVariant {
    is_valid: true,
    kind: VariantKind::String,
    i: 0,
    f: 0.0,
    b: false,
    s,
    bytes: Vec::new(),
    object_id: 0,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn truthy_converts_common_representations() {
    assert!(truthy(&Value::Bool(true)));
    assert!(truthy(&serde_json::json!(1)));
    assert!(!truthy(&serde_json::json!(0)));
    assert!(!truthy(&Value::String("false".to_string())));
    assert!(truthy(&Value::String("yes".to_string())));
    assert!(!truthy(&Value::Null));
  }

  #[test]
  fn find_ranks_exact_over_substring_over_token_matches() {
    let tree = AccessibilityTree::new();
    *tree.built.lock() = Some(Built {
      ref_to_handle: HashMap::new(),
      flat: vec![
        (1, "Submit".to_string()),
        (2, "Submit Form Now".to_string()),
        (3, "Reset Form".to_string()),
      ],
    });
    let results = tree.find("submit form");
    assert_eq!(results[0].ref_id, 2);
    assert!(results.iter().any(|m| m.ref_id == 3));
  }

  #[test]
  fn resolve_ref_fails_after_a_fresh_read_page_replaces_the_map() {
    let tree = AccessibilityTree::new();
    *tree.built.lock() = Some(Built {
      ref_to_handle: HashMap::from([(1, Handle(42))]),
      flat: vec![(1, "Old".to_string())],
    });
    assert!(tree.resolve_ref(1).is_ok());
    *tree.built.lock() = Some(Built {
      ref_to_handle: HashMap::new(),
      flat: Vec::new(),
    });
    assert!(matches!(tree.resolve_ref(1), Err(ProbeError::RefExpired { ref_id: 1 })));
  }

  #[test]
  fn get_page_text_joins_nonempty_labels_in_order() {
    let tree = AccessibilityTree::new();
    *tree.built.lock() = Some(Built {
      ref_to_handle: HashMap::new(),
      flat: vec![(1, "Name".to_string()), (2, String::new()), (3, "Submit".to_string())],
    });
    assert_eq!(tree.get_page_text(), "Name\nSubmit");
  }
}
