/*!
Widget-class → accessibility role table (§6 "Role table"). Unknown classes fall back
to their nearest ancestor's role (walking `class_chain`), ultimately to `Generic`.
*/

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Button,
  TextBox,
  Checkbox,
  Radio,
  ComboBox,
  Slider,
  SpinButton,
  StaticText,
  Menu,
  MenuBar,
  List,
  Table,
  Tree,
  TabList,
  Generic,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RoleFlags {
  pub clickable: bool,
  pub editable: bool,
  pub multiline: bool,
  pub checkable: bool,
  pub expandable: bool,
  pub selectable: bool,
  pub adjustable: bool,
}

impl Role {
  pub const fn flags(self) -> RoleFlags {
    match self {
      Self::Button => RoleFlags {
        clickable: true,
        ..EMPTY
      },
      Self::TextBox => RoleFlags {
        editable: true,
        ..EMPTY
      },
      Self::Checkbox | Self::Radio => RoleFlags {
        checkable: true,
        ..EMPTY
      },
      Self::ComboBox => RoleFlags {
        expandable: true,
        selectable: true,
        ..EMPTY
      },
      Self::Slider | Self::SpinButton => RoleFlags {
        adjustable: true,
        editable: matches!(self, Self::SpinButton),
        ..EMPTY
      },
      Self::Menu => RoleFlags {
        expandable: true,
        ..EMPTY
      },
      Self::List => RoleFlags {
        selectable: true,
        ..EMPTY
      },
      Self::Tree => RoleFlags {
        expandable: true,
        ..EMPTY
      },
      Self::TabList => RoleFlags {
        selectable: true,
        ..EMPTY
      },
      Self::StaticText | Self::MenuBar | Self::Table | Self::Generic => EMPTY,
    }
  }

  pub const fn is_interactable(self) -> bool {
    let flags = self.flags();
    flags.clickable || flags.editable || flags.checkable || flags.adjustable || flags.selectable
  }

  pub const fn as_str(self) -> &'static str {
    match self {
      Self::Button => "button",
      Self::TextBox => "textbox",
      Self::Checkbox => "checkbox",
      Self::Radio => "radio",
      Self::ComboBox => "combobox",
      Self::Slider => "slider",
      Self::SpinButton => "spinbutton",
      Self::StaticText => "statictext",
      Self::Menu => "menu",
      Self::MenuBar => "menubar",
      Self::List => "list",
      Self::Table => "table",
      Self::Tree => "tree",
      Self::TabList => "tablist",
      Self::Generic => "generic",
    }
  }
}

const EMPTY: RoleFlags = RoleFlags {
  clickable: false,
  editable: false,
  multiline: false,
  checkable: false,
  expandable: false,
  selectable: false,
  adjustable: false,
};

/// Maps a single class name to a role, or `None` if this class isn't in the table
/// (caller should retry with the next class up the chain).
fn role_for_class_name(class_name: &str) -> Option<Role> {
  Some(match class_name {
    "QPushButton" | "QToolButton" | "QCommandLinkButton" => Role::Button,
    "QLineEdit" => Role::TextBox,
    "QTextEdit" | "QPlainTextEdit" => return Some(Role::TextBox),
    "QCheckBox" => Role::Checkbox,
    "QRadioButton" => Role::Radio,
    "QComboBox" | "QFontComboBox" => Role::ComboBox,
    "QSlider" | "QDial" => Role::Slider,
    "QSpinBox" | "QDoubleSpinBox" => Role::SpinButton,
    "QLabel" => Role::StaticText,
    "QMenu" => Role::Menu,
    "QMenuBar" => Role::MenuBar,
    "QListWidget" | "QListView" => Role::List,
    "QTableWidget" | "QTableView" => Role::Table,
    "QTreeWidget" | "QTreeView" => Role::Tree,
    "QTabBar" | "QTabWidget" => Role::TabList,
    _ => return None,
  })
}

/// Is `class_name` one of the two multiline text-edit classes? Tracked separately
/// from the class→role table because multiline is a flag refinement, not a
/// different role.
fn is_multiline_class(class_name: &str) -> bool {
  matches!(class_name, "QTextEdit" | "QPlainTextEdit")
}

/// Resolves a role by walking `class_chain` (most-derived class first, per
/// `QMetaObject::className()`/`superClass()` order) until a known class is found.
/// Falls back to `Generic` if nothing in the chain matches.
pub fn resolve(class_chain: &[String]) -> (Role, RoleFlags) {
  for class_name in class_chain {
    if let Some(role) = role_for_class_name(class_name) {
      let mut flags = role.flags();
      flags.multiline = is_multiline_class(class_name);
      return (role, flags);
    }
  }
  (Role::Generic, RoleFlags::default())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn chain(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
  }

  #[test]
  fn push_button_maps_to_clickable_button() {
    let (role, flags) = resolve(&chain(&["QPushButton", "QAbstractButton", "QWidget", "QObject"]));
    assert_eq!(role, Role::Button);
    assert!(flags.clickable);
  }

  #[test]
  fn text_edit_is_editable_and_multiline() {
    let (role, flags) = resolve(&chain(&["QTextEdit", "QAbstractScrollArea", "QFrame", "QWidget"]));
    assert_eq!(role, Role::TextBox);
    assert!(flags.editable);
    assert!(flags.multiline);
  }

  #[test]
  fn line_edit_is_editable_but_not_multiline() {
    let (_, flags) = resolve(&chain(&["QLineEdit", "QWidget"]));
    assert!(flags.editable);
    assert!(!flags.multiline);
  }

  #[test]
  fn unknown_leaf_falls_back_up_the_chain() {
    let (role, _) = resolve(&chain(&["MyCustomButton", "QPushButton", "QWidget"]));
    assert_eq!(role, Role::Button);
  }

  #[test]
  fn entirely_unknown_chain_falls_back_to_generic() {
    let (role, _) = resolve(&chain(&["MyCustomThing", "QObject"]));
    assert_eq!(role, Role::Generic);
  }
}
