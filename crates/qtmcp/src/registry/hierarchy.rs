//! The hierarchical-id algorithm, factored out from [`super::Registry`] so it can be
//! unit-tested against a synthetic object graph with no Qt process involved.

use crate::ffi::Handle;

/// Everything the algorithm needs to know about one node. Implemented once against
/// live `ffi::snapshot` calls and once against a fake graph in tests.
pub trait TreeAccessor {
  fn parent(&self, handle: Handle) -> Option<Handle>;
  fn class_name(&self, handle: Handle) -> String;
  fn object_name(&self, handle: Handle) -> String;
  /// Siblings under the same parent, in the framework's own child order. Used only
  /// to compute `ClassName[n]` disambiguation indices.
  fn siblings(&self, parent: Handle) -> Vec<Handle>;
}

/// Computes the `Root/childSeg/.../leafSeg` path for `handle`, walking up to (and
/// including) the application singleton. Returns `None` if `handle` has no path to
/// the application root (orphaned object, or `handle` itself is the application).
pub fn compute_hierarchical_id(
  accessor: &impl TreeAccessor,
  application: Handle,
  handle: Handle,
) -> String {
  let mut segments = Vec::new();
  let mut current = handle;

  loop {
    segments.push(segment_for(accessor, current));
    if current == application {
      break;
    }
    match accessor.parent(current) {
      Some(parent) => current = parent,
      // Orphaned relative to the application root: still emit a best-effort path,
      // the caller resolves lookups by walking from the application forward, so an
      // id that can't be produced by that walk is already unreachable by resolution
      // even if we compute one here.
      None => break,
    }
  }

  segments.reverse();
  segments.join("/")
}

fn segment_for(accessor: &impl TreeAccessor, handle: Handle) -> String {
  let class_name = accessor.class_name(handle);
  let object_name = accessor.object_name(handle);
  if !object_name.is_empty() {
    return format!("{class_name}#{object_name}");
  }

  let Some(parent) = accessor.parent(handle) else {
    return class_name;
  };

  let same_class_siblings: Vec<Handle> = accessor
    .siblings(parent)
    .into_iter()
    .filter(|h| accessor.class_name(*h) == class_name)
    .collect();

  if same_class_siblings.len() <= 1 {
    return class_name;
  }

  let index = same_class_siblings
    .iter()
    .position(|h| *h == handle)
    .unwrap_or(0);
  format!("{class_name}[{index}]")
}

/// Resolves a HierarchicalId by walking from the application singleton, matching one
/// segment at a time. Returns the first live match, or `None`.
pub fn resolve_hierarchical_id(
  accessor: &impl TreeAccessor,
  application: Handle,
  id: &str,
) -> Option<Handle> {
  let mut segments = id.split('/');
  let root_segment = segments.next()?;
  if segment_for(accessor, application) != root_segment {
    return None;
  }

  let mut current = application;
  for segment in segments {
    let mut found = None;
    for child in accessor.siblings(current) {
      if segment_for(accessor, child) == segment {
        found = Some(child);
        break;
      }
    }
    current = found?;
  }
  Some(current)
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  #[derive(Default)]
  struct FakeTree {
    parent_of: HashMap<Handle, Handle>,
    children_of: HashMap<Handle, Vec<Handle>>,
    class_of: HashMap<Handle, String>,
    name_of: HashMap<Handle, String>,
  }

  impl FakeTree {
    fn add(&mut self, handle: Handle, parent: Option<Handle>, class: &str, name: &str) {
      self.class_of.insert(handle, class.to_string());
      self.name_of.insert(handle, name.to_string());
      if let Some(parent) = parent {
        self.parent_of.insert(handle, parent);
        self.children_of.entry(parent).or_default().push(handle);
      }
    }
  }

  impl TreeAccessor for FakeTree {
    fn parent(&self, handle: Handle) -> Option<Handle> {
      self.parent_of.get(&handle).copied()
    }
    fn class_name(&self, handle: Handle) -> String {
      self.class_of.get(&handle).cloned().unwrap_or_default()
    }
    fn object_name(&self, handle: Handle) -> String {
      self.name_of.get(&handle).cloned().unwrap_or_default()
    }
    fn siblings(&self, parent: Handle) -> Vec<Handle> {
      self.children_of.get(&parent).cloned().unwrap_or_default()
    }
  }

  fn h(n: u64) -> Handle {
    Handle(n)
  }

  #[test]
  fn named_object_uses_hash_segment() {
    let mut tree = FakeTree::default();
    tree.add(h(1), None, "QApplication", "");
    tree.add(h(2), Some(h(1)), "QMainWindow", "");
    tree.add(h(3), Some(h(2)), "QPushButton", "submit");

    let id = compute_hierarchical_id(&tree, h(1), h(3));
    assert_eq!(id, "QApplication/QMainWindow/QPushButton#submit");
  }

  #[test]
  fn unnamed_only_child_uses_bare_class_name() {
    let mut tree = FakeTree::default();
    tree.add(h(1), None, "QApplication", "");
    tree.add(h(2), Some(h(1)), "QMainWindow", "");

    let id = compute_hierarchical_id(&tree, h(1), h(2));
    assert_eq!(id, "QApplication/QMainWindow");
  }

  #[test]
  fn unnamed_siblings_get_indexed() {
    let mut tree = FakeTree::default();
    tree.add(h(1), None, "QApplication", "");
    tree.add(h(2), Some(h(1)), "QMainWindow", "");
    tree.add(h(3), Some(h(2)), "QLabel", "");
    tree.add(h(4), Some(h(2)), "QLabel", "");

    assert_eq!(
      compute_hierarchical_id(&tree, h(1), h(3)),
      "QApplication/QMainWindow/QLabel[0]"
    );
    assert_eq!(
      compute_hierarchical_id(&tree, h(1), h(4)),
      "QApplication/QMainWindow/QLabel[1]"
    );
  }

  #[test]
  fn application_root_included_in_search() {
    let mut tree = FakeTree::default();
    tree.add(h(1), None, "QApplication", "");
    tree.add(h(2), Some(h(1)), "QMainWindow", "");

    let resolved = resolve_hierarchical_id(&tree, h(1), "QApplication/QMainWindow");
    assert_eq!(resolved, Some(h(2)));

    // Without the application segment the id should not resolve.
    assert_eq!(resolve_hierarchical_id(&tree, h(1), "QMainWindow"), None);
  }

  #[test]
  fn resolve_round_trips_through_compute() {
    let mut tree = FakeTree::default();
    tree.add(h(1), None, "QApplication", "");
    tree.add(h(2), Some(h(1)), "QMainWindow", "");
    tree.add(h(3), Some(h(2)), "QWidget", "centralWidget");
    tree.add(h(4), Some(h(3)), "QPushButton", "submit");

    let id = compute_hierarchical_id(&tree, h(1), h(4));
    assert_eq!(resolve_hierarchical_id(&tree, h(1), &id), Some(h(4)));
  }
}
