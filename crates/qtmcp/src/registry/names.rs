//! The symbolic name map: caller-defined short strings to HierarchicalIds,
//! optionally persisted to a JSON file (`{ "myButton": "App/.../QPushButton#submit" }`).
//!
//! Kept as its own mutex-guarded map, separate from [`super::Registry`]'s
//! `parking_lot::RwLock`, because it is also read from test/tooling contexts that
//! have no reason to take the registry's main-thread-affined lock.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum NameMapError {
  #[error("name not found: {0}")]
  NotFound(String),
  #[error("name already exists: {0}")]
  AlreadyExists(String),
  #[error("failed to load name map from {path}: {source}")]
  Load {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("failed to parse name map from {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
  #[error("failed to save name map to {path}: {source}")]
  Save {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

#[derive(Debug, Default)]
pub struct NameMap {
  entries: Mutex<HashMap<String, String>>,
}

impl NameMap {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn load(path: &Path) -> Result<Self, NameMapError> {
    let contents = std::fs::read_to_string(path).map_err(|source| NameMapError::Load {
      path: path.to_path_buf(),
      source,
    })?;
    let entries: HashMap<String, String> =
      serde_json::from_str(&contents).map_err(|source| NameMapError::Parse {
        path: path.to_path_buf(),
        source,
      })?;
    Ok(Self {
      entries: Mutex::new(entries),
    })
  }

  pub fn save(&self, path: &Path) -> Result<(), NameMapError> {
    let json = serde_json::to_string_pretty(&*self.entries.lock())
      .expect("HashMap<String, String> always serializes");
    std::fs::write(path, json).map_err(|source| NameMapError::Save {
      path: path.to_path_buf(),
      source,
    })
  }

  /// register(n, p) followed by resolve(n) == resolve(p), as long as `p` resolves.
  pub fn register(&self, name: &str, hierarchical_id: &str, overwrite: bool) -> Result<(), NameMapError> {
    let mut entries = self.entries.lock();
    if !overwrite && entries.contains_key(name) {
      return Err(NameMapError::AlreadyExists(name.to_string()));
    }
    entries.insert(name.to_string(), hierarchical_id.to_string());
    Ok(())
  }

  pub fn unregister(&self, name: &str) -> Result<(), NameMapError> {
    self
      .entries
      .lock()
      .remove(name)
      .map(|_| ())
      .ok_or_else(|| NameMapError::NotFound(name.to_string()))
  }

  /// Returns the stored HierarchicalId even if it is not currently resolvable — per
  /// spec, an unresolvable target is not an error until lookup time.
  pub fn expand(&self, name: &str) -> Option<String> {
    self.entries.lock().get(name).cloned()
  }

  pub fn list(&self) -> HashMap<String, String> {
    self.entries.lock().clone()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn register_then_expand_round_trips() {
    let map = NameMap::new();
    map.register("submit", "App/MainWindow/QPushButton#submit", false).unwrap();
    assert_eq!(
      map.expand("submit"),
      Some("App/MainWindow/QPushButton#submit".to_string())
    );
  }

  #[test]
  fn unregister_then_expand_falls_through() {
    let map = NameMap::new();
    map.register("submit", "App/MainWindow/QPushButton#submit", false).unwrap();
    map.unregister("submit").unwrap();
    assert_eq!(map.expand("submit"), None);
  }

  #[test]
  fn register_without_overwrite_rejects_duplicates() {
    let map = NameMap::new();
    map.register("submit", "App/QPushButton#submit", false).unwrap();
    let err = map.register("submit", "App/QPushButton#other", false).unwrap_err();
    assert!(matches!(err, NameMapError::AlreadyExists(_)));
  }
}
