//! Variant↔JSON marshaling (§4.3). Operates on [`RawVariant`], the already-decoded
//! intermediate shape the `cxx` bridge hands back, so this file has no Qt calls in
//! it and is fully unit-testable.

use crate::ffi::{RawVariant, VariantKind};
use base64::Engine;
use serde_json::{json, Value};

/// Converts a decoded variant to JSON, gating `null` solely on `is_valid` — never on
/// whether the payload is itself a "zero value" (an empty string stays `""`, never
/// `null`; see the value-null vs. container-null note).
pub fn to_json(raw: &RawVariant) -> Value {
  if !raw.is_valid {
    return Value::Null;
  }
  match raw.kind {
    VariantKind::Invalid => Value::Null,
    VariantKind::Int => json!(raw.i),
    VariantKind::Double => json!(raw.f),
    VariantKind::Bool => json!(raw.b),
    VariantKind::String => json!(raw.s),
    VariantKind::ByteArray => json!(base64::engine::general_purpose::STANDARD.encode(&raw.bytes)),
    VariantKind::Point => point_to_json(raw.i),
    VariantKind::Size => size_to_json(raw.i),
    VariantKind::Rect => rect_to_json(raw.i),
    VariantKind::Color => json!(format!("#{:08x}", raw.i as u32)),
    VariantKind::DateTime => json!(raw.s),
    VariantKind::Url => json!(raw.s),
    VariantKind::Enum => json!(raw.i),
    VariantKind::Object => json!(raw.object_id.to_string()),
    VariantKind::Unknown => json!({ "type": "unknown", "stringRepr": raw.s }),
    _ => Value::Null,
  }
}

/// Converts a property's `geometry` read straight to the `{x,y,width,height}` shape
/// used by tree serialization, tolerating an invalid/non-widget read as `None`.
pub fn geometry_to_json(raw: RawVariant) -> Value {
  if !raw.is_valid {
    return Value::Null;
  }
  rect_to_json(raw.i)
}

fn point_to_json(packed: i64) -> Value {
  let (x, y) = unpack_i16_pair(packed);
  json!({ "x": x, "y": y })
}

fn size_to_json(packed: i64) -> Value {
  let (w, h) = unpack_i16_pair(packed);
  json!({ "width": w, "height": h })
}

fn rect_to_json(packed: i64) -> Value {
  let x = ((packed >> 48) & 0xffff) as i16;
  let y = ((packed >> 32) & 0xffff) as i16;
  let w = ((packed >> 16) & 0xffff) as i16;
  let h = (packed & 0xffff) as i16;
  json!({ "x": x, "y": y, "width": w, "height": h })
}

fn unpack_i16_pair(packed: i64) -> (i16, i16) {
  (((packed >> 16) & 0xffff) as i16, (packed & 0xffff) as i16)
}

/// Converts a JSON value back into a [`RawVariant`] of the requested kind, for
/// property writes and method-argument conversion. Aggregate JSON shapes
/// (`{x,y}`, `{width,height}`, `{x,y,width,height}`, `#rrggbbaa`) are re-packed the
/// same way [`to_json`] unpacked them.
pub fn from_json(value: &Value, declared_type: &str) -> Option<RawVariant> {
  let kind = kind_for_declared_type(declared_type);
  let mut raw = RawVariant {
    is_valid: true,
    kind,
    i: 0,
    f: 0.0,
    b: false,
    s: String::new(),
    bytes: Vec::new(),
    object_id: 0,
  };

  match kind {
    VariantKind::Int | VariantKind::Enum => raw.i = value.as_i64()?,
    VariantKind::Double => raw.f = value.as_f64()?,
    VariantKind::Bool => raw.b = value.as_bool()?,
    VariantKind::String | VariantKind::DateTime | VariantKind::Url => {
      raw.s = value.as_str()?.to_string();
    }
    VariantKind::ByteArray => {
      raw.bytes = base64::engine::general_purpose::STANDARD
        .decode(value.as_str()?)
        .ok()?;
    }
    VariantKind::Color => {
      let text = value.as_str()?.trim_start_matches('#');
      raw.i = i64::from(u32::from_str_radix(text, 16).ok()?);
    }
    _ => return None,
  }
  Some(raw)
}

fn kind_for_declared_type(declared_type: &str) -> VariantKind {
  match declared_type {
    "int" | "uint" | "qlonglong" | "qulonglong" | "short" | "long" => VariantKind::Int,
    "double" | "float" => VariantKind::Double,
    "bool" => VariantKind::Bool,
    "QString" => VariantKind::String,
    "QByteArray" => VariantKind::ByteArray,
    "QPoint" | "QPointF" => VariantKind::Point,
    "QSize" | "QSizeF" => VariantKind::Size,
    "QRect" | "QRectF" => VariantKind::Rect,
    "QColor" => VariantKind::Color,
    "QDateTime" | "QDate" | "QTime" => VariantKind::DateTime,
    "QUrl" => VariantKind::Url,
    _ => VariantKind::Unknown,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn raw_string(s: &str) -> RawVariant {
    RawVariant {
      is_valid: true,
      kind: VariantKind::String,
      i: 0,
      f: 0.0,
      b: false,
      s: s.to_string(),
      bytes: Vec::new(),
      object_id: 0,
    }
  }

  #[test]
  fn invalid_variant_is_json_null() {
    let raw = RawVariant {
      is_valid: false,
      kind: VariantKind::String,
      i: 0,
      f: 0.0,
      b: false,
      s: "ignored".to_string(),
      bytes: Vec::new(),
      object_id: 0,
    };
    assert_eq!(to_json(&raw), Value::Null);
  }

  #[test]
  fn empty_string_is_not_null() {
    assert_eq!(to_json(&raw_string("")), json!(""));
  }

  #[test]
  fn color_encodes_as_hash_rrggbbaa() {
    let raw = RawVariant {
      is_valid: true,
      kind: VariantKind::Color,
      i: 0x00ff00ff,
      f: 0.0,
      b: false,
      s: String::new(),
      bytes: Vec::new(),
      object_id: 0,
    };
    assert_eq!(to_json(&raw), json!("#00ff00ff"));
  }

  #[test]
  fn string_round_trips_through_json() {
    let json_value = json!("hello");
    let raw = from_json(&json_value, "QString").unwrap();
    assert_eq!(to_json(&raw), json_value);
  }

  #[test]
  fn byte_array_round_trips_through_base64() {
    let raw = RawVariant {
      is_valid: true,
      kind: VariantKind::ByteArray,
      i: 0,
      f: 0.0,
      b: false,
      s: String::new(),
      bytes: vec![1, 2, 3, 4],
      object_id: 0,
    };
    let encoded = to_json(&raw);
    let decoded = from_json(&encoded, "QByteArray").unwrap();
    assert_eq!(decoded.bytes, vec![1, 2, 3, 4]);
  }
}

#[cfg(test)]
mod proptests {
  use super::*;
  use proptest::prelude::*;

  proptest! {
    /// Any string survives a QString round trip through JSON.
    #[test]
    fn string_roundtrips_through_qstring(s in ".*") {
      let json_value = json!(s);
      let raw = from_json(&json_value, "QString").expect("string always parses as QString");
      prop_assert_eq!(to_json(&raw), json_value);
    }

    /// Any i64 survives an int round trip through JSON.
    #[test]
    fn int_roundtrips(n in any::<i64>()) {
      let json_value = json!(n);
      let raw = from_json(&json_value, "int").expect("i64 always parses as int");
      prop_assert_eq!(to_json(&raw), json_value);
    }

    /// Any finite f64 survives a double round trip through JSON.
    #[test]
    fn double_roundtrips(n in any::<f64>().prop_filter("finite", |n| n.is_finite())) {
      let json_value = json!(n);
      let raw = from_json(&json_value, "double").expect("finite f64 always parses as double");
      prop_assert_eq!(to_json(&raw), json_value);
    }

    /// Any byte string survives a QByteArray round trip through base64.
    #[test]
    fn byte_array_roundtrips(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
      let raw = RawVariant {
        is_valid: true,
        kind: VariantKind::ByteArray,
        i: 0,
        f: 0.0,
        b: false,
        s: String::new(),
        bytes: bytes.clone(),
        object_id: 0,
      };
      let decoded = from_json(&to_json(&raw), "QByteArray").expect("encoded byte array always decodes");
      prop_assert_eq!(decoded.bytes, bytes);
    }
  }
}
