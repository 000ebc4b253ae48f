//! Case-insensitive key-name dictionary (§4.6): Chrome-style (`ArrowUp`, `Enter`)
//! and Unix-tool-style (`Up`, `Return`) names map to the same `Qt::Key` code.
//! Combo strings split on `+`; the last token is the key, earlier tokens are
//! modifiers.

/// A minimal subset of `Qt::Key` values, enough for keyboard automation without
/// requiring the full header's ~700 entries to be mirrored here.
mod qt_key {
  pub const BACKSPACE: i32 = 0x01000003;
  pub const TAB: i32 = 0x01000001;
  pub const RETURN: i32 = 0x01000004;
  pub const ENTER: i32 = 0x01000005;
  pub const ESCAPE: i32 = 0x01000000;
  pub const SPACE: i32 = 0x20;
  pub const DELETE: i32 = 0x01000007;
  pub const HOME: i32 = 0x01000010;
  pub const END: i32 = 0x01000011;
  pub const PAGE_UP: i32 = 0x01000016;
  pub const PAGE_DOWN: i32 = 0x01000017;
  pub const LEFT: i32 = 0x01000012;
  pub const UP: i32 = 0x01000013;
  pub const RIGHT: i32 = 0x01000014;
  pub const DOWN: i32 = 0x01000015;
  pub const F1: i32 = 0x01000030;
}

mod qt_modifier {
  pub const SHIFT: u32 = 0x0200_0000;
  pub const CTRL: u32 = 0x0400_0000;
  pub const ALT: u32 = 0x0800_0000;
  pub const META: u32 = 0x1000_0000;
}

fn key_code_for(name: &str) -> Option<i32> {
  let lower = name.to_ascii_lowercase();
  Some(match lower.as_str() {
    "backspace" => qt_key::BACKSPACE,
    "tab" => qt_key::TAB,
    "return" | "enter" => {
      if lower == "enter" {
        qt_key::ENTER
      } else {
        qt_key::RETURN
      }
    }
    "escape" | "esc" => qt_key::ESCAPE,
    "space" => qt_key::SPACE,
    "delete" | "del" => qt_key::DELETE,
    "home" => qt_key::HOME,
    "end" => qt_key::END,
    "pageup" | "page_up" => qt_key::PAGE_UP,
    "pagedown" | "page_down" => qt_key::PAGE_DOWN,
    "left" | "arrowleft" => qt_key::LEFT,
    "up" | "arrowup" => qt_key::UP,
    "right" | "arrowright" => qt_key::RIGHT,
    "down" | "arrowdown" => qt_key::DOWN,
    "f1" => qt_key::F1,
    single if single.chars().count() == 1 => {
      i32::from(single.chars().next()?.to_ascii_uppercase() as u8)
    }
    _ => return None,
  })
}

fn modifier_for(name: &str) -> Option<u32> {
  match name.to_ascii_lowercase().as_str() {
    "ctrl" | "control" => Some(qt_modifier::CTRL),
    "shift" => Some(qt_modifier::SHIFT),
    "alt" | "option" => Some(qt_modifier::ALT),
    "meta" | "cmd" | "command" | "super" | "win" => Some(qt_modifier::META),
    _ => None,
  }
}

/// Parses a combo string like `"ctrl+shift+s"` into `(key_code, modifiers_bitmask)`.
/// The last token is always the key; every earlier token must be a recognized
/// modifier.
pub fn parse_combo(combo: &str) -> Option<(i32, u32)> {
  let tokens: Vec<&str> = combo.split('+').filter(|t| !t.is_empty()).collect();
  let (&key_token, modifier_tokens) = tokens.split_last()?;
  let key_code = key_code_for(key_token)?;
  let mut modifiers = 0u32;
  for token in modifier_tokens {
    modifiers |= modifier_for(token)?;
  }
  Some((key_code, modifiers))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn chrome_and_unix_names_map_to_the_same_code() {
    assert_eq!(key_code_for("ArrowUp"), key_code_for("Up"));
    assert_eq!(key_code_for("Enter"), Some(qt_key::ENTER));
  }

  #[test]
  fn combo_splits_modifiers_from_key() {
    let (key, modifiers) = parse_combo("ctrl+shift+s").unwrap();
    assert_eq!(key, key_code_for("s").unwrap());
    assert_eq!(modifiers, qt_modifier::CTRL | qt_modifier::SHIFT);
  }

  #[test]
  fn single_key_combo_has_no_modifiers() {
    let (key, modifiers) = parse_combo("Return").unwrap();
    assert_eq!(key, qt_key::RETURN);
    assert_eq!(modifiers, 0);
  }

  #[test]
  fn unknown_modifier_fails_to_parse() {
    assert!(parse_combo("hyper+s").is_none());
  }

  #[test]
  fn case_insensitive_matching() {
    assert_eq!(parse_combo("CTRL+S"), parse_combo("ctrl+s"));
  }
}
