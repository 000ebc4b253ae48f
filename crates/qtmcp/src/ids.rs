//! The three object-reference styles (§3): [`NumericRef`] and the plain `String`
//! HierarchicalId, plus the resolution-order enum used by [`crate::registry`].

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Session-scoped monotonically increasing alias for an object. Never recycled;
/// cleared (by dropping the whole map) on client disconnect.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, From, Into,
)]
pub struct NumericRef(pub u64);

/// Monotonic counter backing [`NumericRef`] allocation. Lives outside `Registry` so
/// a client disconnect (which clears the registry's numeric-ref map) does not reset
/// it — reused numbers would violate the monotonicity invariant across sessions.
#[derive(Debug, Default)]
pub struct NumericRefCounter(AtomicU64);

impl NumericRefCounter {
  pub const fn new() -> Self {
    Self(AtomicU64::new(1))
  }

  pub fn next(&self) -> NumericRef {
    NumericRef(self.0.fetch_add(1, Ordering::Relaxed))
  }
}

/// The first step of resolution (§4.2): does this opaque id string look like a
/// [`NumericRef`]? Whether a non-numeric id is symbolic or hierarchical can only be
/// decided by consulting the name map, so that part of the decision stays in
/// `Registry::resolve`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdStyle {
  Numeric,
  Other,
}

pub fn classify(id: &str) -> IdStyle {
  if let Some(rest) = id.strip_prefix('#') {
    if !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()) {
      return IdStyle::Numeric;
    }
  }
  if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) {
    return IdStyle::Numeric;
  }
  IdStyle::Other
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn numeric_ref_counter_is_monotonic_and_starts_at_one() {
    let counter = NumericRefCounter::new();
    let a = counter.next();
    let b = counter.next();
    assert_eq!(a.0, 1);
    assert!(b.0 > a.0);
  }

  #[test]
  fn classify_recognizes_numeric_forms() {
    assert_eq!(classify("42"), IdStyle::Numeric);
    assert_eq!(classify("#42"), IdStyle::Numeric);
    assert_eq!(classify("App/MainWindow"), IdStyle::Other);
  }
}
