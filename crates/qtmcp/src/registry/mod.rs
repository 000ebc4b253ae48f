/*!
Object registry (§4.2): tracks every framework object for its entire lifetime,
assigns hierarchical identifiers, and exposes multi-style lookup.

# Module structure

- `mod.rs` — `Registry`, lifecycle hooks, resolution, search operations.
- `hierarchy.rs` — the pure hierarchical-id algorithm (no Qt calls, unit-tested).
- `names.rs` — the symbolic name map.
*/

pub mod hierarchy;
pub mod names;

use crate::error::{ProbeError, ProbeResult};
use crate::ffi::{self, Handle};
use crate::ids::{classify, IdStyle, NumericRef, NumericRefCounter};
use hierarchy::TreeAccessor;
use names::NameMap;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Live-query accessor backing [`hierarchy::compute_hierarchical_id`] against the
/// actual running Qt process. Every call goes straight to `ffi::snapshot`, so the
/// id is always computed from the framework's current tree shape, never from a
/// Registry-owned shadow copy that could drift from it.
struct LiveTree;

impl TreeAccessor for LiveTree {
  fn parent(&self, handle: Handle) -> Option<Handle> {
    let snap = ffi::snapshot(handle);
    (!Handle(snap.parent_handle).is_null()).then_some(Handle(snap.parent_handle))
  }

  fn class_name(&self, handle: Handle) -> String {
    ffi::snapshot(handle).class_chain.into_iter().next().unwrap_or_default()
  }

  fn object_name(&self, handle: Handle) -> String {
    ffi::snapshot(handle).object_name
  }

  fn siblings(&self, parent: Handle) -> Vec<Handle> {
    ffi::snapshot(parent)
      .child_handles
      .into_iter()
      .map(Handle)
      .collect()
  }
}

/// Tree node emitted by [`Registry::serialize_tree`].
#[derive(Debug, Clone, serde::Serialize)]
pub struct TreeNode {
  pub object_id: String,
  pub class_name: String,
  pub object_name: String,
  pub visible: Option<bool>,
  pub geometry: Option<serde_json::Value>,
  pub children: Vec<TreeNode>,
}

/// Tracks every live framework object. Indices are mutated only from the main
/// thread (see the concurrency model); this type is `!Send`-by-convention even
/// though nothing here stops it compiling off-thread — enforcement is the loader's
/// job, not the type system's, because Qt's own thread affinity isn't visible to
/// Rust either.
pub struct Registry {
  application: Handle,
  live: HashSet<Handle>,
  name_index: HashMap<String, HashSet<Handle>>,
  numeric_to_handle: HashMap<NumericRef, Handle>,
  handle_to_numeric: HashMap<Handle, NumericRef>,
  numeric_counter: Arc<NumericRefCounter>,
  id_cache: HashMap<Handle, String>,
  pub names: NameMap,
}

impl Registry {
  pub fn new(application: Handle, numeric_counter: Arc<NumericRefCounter>) -> Self {
    let mut live = HashSet::new();
    live.insert(application);
    Self {
      application,
      live,
      name_index: HashMap::new(),
      numeric_to_handle: HashMap::new(),
      handle_to_numeric: HashMap::new(),
      numeric_counter,
      id_cache: HashMap::new(),
      names: NameMap::new(),
    }
  }

  pub const fn application(&self) -> Handle {
    self.application
  }

  pub fn is_live(&self, handle: Handle) -> bool {
    self.live.contains(&handle) && ffi::is_alive(handle)
  }

  /// Called from the object-added hook.
  pub fn on_object_added(&mut self, handle: Handle) {
    self.live.insert(handle);
    let name = ffi::snapshot(handle).object_name;
    if !name.is_empty() {
      self.name_index.entry(name).or_default().insert(handle);
    }
    // A new sibling can shift every `ClassName[n]` segment among its same-class
    // siblings, so the cache is invalidated wholesale rather than per-node.
    self.id_cache.clear();
  }

  /// Called from the object-removed hook.
  pub fn on_object_removed(&mut self, handle: Handle) {
    self.live.remove(&handle);
    self.name_index.retain(|_, handles| {
      handles.remove(&handle);
      !handles.is_empty()
    });
    if let Some(numeric) = self.handle_to_numeric.remove(&handle) {
      self.numeric_to_handle.remove(&numeric);
    }
    self.id_cache.remove(&handle);
    self.id_cache.clear();
  }

  /// Clears the numeric-ref map; called on client disconnect (§3 NumericRef
  /// lifecycle). The monotonic counter itself is not reset.
  pub fn clear_numeric_refs(&mut self) {
    self.numeric_to_handle.clear();
    self.handle_to_numeric.clear();
  }

  /// Lazily assigns a NumericRef to `handle` the first time it appears in a
  /// response, per §3.
  pub fn numeric_ref_for(&mut self, handle: Handle) -> NumericRef {
    if let Some(existing) = self.handle_to_numeric.get(&handle) {
      return *existing;
    }
    let numeric = self.numeric_counter.next();
    self.numeric_to_handle.insert(numeric, handle);
    self.handle_to_numeric.insert(handle, numeric);
    numeric
  }

  pub fn handle_for_numeric_ref(&self, numeric: NumericRef) -> Option<Handle> {
    self.numeric_to_handle.get(&numeric).copied()
  }

  /// The HierarchicalId for `handle`, cached until the tree changes underneath it.
  pub fn hierarchical_id(&mut self, handle: Handle) -> String {
    if let Some(cached) = self.id_cache.get(&handle) {
      return cached.clone();
    }
    let id = hierarchy::compute_hierarchical_id(&LiveTree, self.application, handle);
    self.id_cache.insert(handle, id.clone());
    id
  }

  /// Multi-style resolution, in order: NumericRef, SymbolicName, HierarchicalId
  /// (§4.2). Never partially matches; returns the first live match or an error.
  pub fn resolve(&mut self, id: &str) -> ProbeResult<Handle> {
    match classify(id) {
      IdStyle::Numeric => {
        let digits = id.trim_start_matches('#');
        let numeric: u64 = digits
          .parse()
          .map_err(|_| ProbeError::ObjectNotFound { id: id.to_string() })?;
        let handle = self
          .handle_for_numeric_ref(NumericRef(numeric))
          .ok_or_else(|| ProbeError::ObjectNotFound { id: id.to_string() })?;
        self.require_live(handle, id)
      }
      IdStyle::Other => {
        if let Some(expanded) = self.names.expand(id) {
          return self.resolve_hierarchical(&expanded, id);
        }
        self.resolve_hierarchical(id, id)
      }
    }
  }

  fn resolve_hierarchical(&mut self, hierarchical_id: &str, original: &str) -> ProbeResult<Handle> {
    let handle = hierarchy::resolve_hierarchical_id(&LiveTree, self.application, hierarchical_id)
      .ok_or_else(|| ProbeError::ObjectNotFound {
        id: original.to_string(),
      })?;
    self.require_live(handle, original)
  }

  fn require_live(&self, handle: Handle, original_id: &str) -> ProbeResult<Handle> {
    if self.is_live(handle) {
      Ok(handle)
    } else {
      Err(ProbeError::ObjectStale {
        id: original_id.to_string(),
      })
    }
  }

  /// find-first by objectName, optionally rooted at a subtree.
  pub fn find_by_name(&self, name: &str, root: Option<Handle>) -> Option<Handle> {
    let candidates = self.name_index.get(name)?;
    match root {
      None => candidates.iter().copied().find(|h| self.is_live(*h)),
      Some(root) => candidates
        .iter()
        .copied()
        .find(|h| self.is_live(*h) && self.is_descendant_of(*h, root)),
    }
  }

  /// find-all by class name (including subclasses), optionally rooted at a subtree.
  pub fn find_all_by_class(&self, class_name: &str, root: Option<Handle>) -> Vec<Handle> {
    let mut out = Vec::new();
    let root = root.unwrap_or(self.application);
    self.walk(root, &mut |handle| {
      if ffi::snapshot(handle).class_chain.iter().any(|c| c == class_name) {
        out.push(handle);
      }
    });
    out
  }

  fn is_descendant_of(&self, handle: Handle, root: Handle) -> bool {
    let mut current = handle;
    loop {
      if current == root {
        return true;
      }
      match LiveTree.parent(current) {
        Some(parent) => current = parent,
        None => return false,
      }
    }
  }

  fn walk(&self, root: Handle, visit: &mut impl FnMut(Handle)) {
    visit(root);
    for child in ffi::snapshot(root).child_handles.into_iter().map(Handle) {
      if self.is_live(child) {
        self.walk(child, visit);
      }
    }
  }

  /// Serializes the subtree rooted at `root` (§4.2's tree serialization).
  pub fn serialize_tree(&mut self, root: Handle, max_depth: Option<usize>) -> TreeNode {
    self.serialize_node(root, max_depth, 0)
  }

  fn serialize_node(&mut self, handle: Handle, max_depth: Option<usize>, depth: usize) -> TreeNode {
    let snap = ffi::snapshot(handle);
    let class_name = snap.class_chain.first().cloned().unwrap_or_default();
    let is_widget = ffi::is_widget(handle);

    let children = if max_depth.is_some_and(|max| depth >= max) {
      Vec::new()
    } else {
      snap
        .child_handles
        .into_iter()
        .map(Handle)
        .filter(|h| self.is_live(*h))
        .map(|h| self.serialize_node(h, max_depth, depth + 1))
        .collect()
    };

    TreeNode {
      object_id: self.hierarchical_id(handle),
      class_name,
      object_name: snap.object_name,
      visible: is_widget.then(|| ffi::widget_is_visible(handle)),
      geometry: is_widget
        .then(|| crate::meta::variant::geometry_to_json(ffi::read_property(handle, "geometry"))),
      children,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn new_registry_contains_only_the_application() {
    let registry = Registry::new(Handle(1), Arc::new(NumericRefCounter::new()));
    assert!(registry.is_live(Handle(1)) || !ffi::is_alive(Handle(1)));
    // is_live also checks `ffi::is_alive`, which is false off-process; the tracked
    // set itself is what this test actually exercises.
    assert!(registry.live.contains(&Handle(1)));
  }

  #[test]
  fn numeric_ref_assignment_is_lazy_and_stable() {
    let mut registry = Registry::new(Handle(1), Arc::new(NumericRefCounter::new()));
    registry.live.insert(Handle(2));
    let first = registry.numeric_ref_for(Handle(2));
    let second = registry.numeric_ref_for(Handle(2));
    assert_eq!(first, second);
    assert_eq!(registry.handle_for_numeric_ref(first), Some(Handle(2)));
  }

  #[test]
  fn disconnect_clears_numeric_refs_but_not_the_counter() {
    let mut registry = Registry::new(Handle(1), Arc::new(NumericRefCounter::new()));
    registry.live.insert(Handle(2));
    let before = registry.numeric_ref_for(Handle(2));
    registry.clear_numeric_refs();
    assert_eq!(registry.handle_for_numeric_ref(before), None);
    let after = registry.numeric_ref_for(Handle(2));
    assert!(after.0 > before.0);
  }
}
