//! The taxonomy from §7, as a single `thiserror` enum. `qtmcp-ws` maps each variant
//! to a numeric code band and an `ErrorDescriptor` (see `qtmcp_ws::envelope`); this
//! crate stays free of JSON-RPC concerns.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
  #[error("object not found: {id}")]
  ObjectNotFound { id: String },

  #[error("object was alive but has since been destroyed: {id}")]
  ObjectStale { id: String },

  #[error("object {id} is a {actual_class}, not a widget")]
  ObjectNotAWidget { id: String, actual_class: String },

  #[error("property not found: {name}")]
  PropertyNotFound { name: String, available: Vec<String> },

  #[error("property is read-only: {name}")]
  PropertyReadOnly { name: String },

  #[error("property type mismatch for {name}: expected {expected}")]
  PropertyTypeMismatch { name: String, expected: String },

  #[error("method not found: {name}")]
  MethodNotFound { name: String, available: Vec<String> },

  #[error("method invocation failed: {name}: {reason}")]
  MethodInvocationFailed { name: String, reason: String },

  #[error("no overload of {name} matches the given arguments")]
  MethodArgumentMismatch { name: String, candidates: Vec<String> },

  #[error("signal not found: {name}")]
  SignalNotFound { name: String },

  #[error("subscription not found: {id}")]
  SubscriptionNotFound { id: String },

  #[error("widget is not visible: {id}")]
  WidgetNotVisible { id: String },

  #[error("widget is not enabled: {id}")]
  WidgetNotEnabled { id: String },

  #[error("capture failed: {reason}")]
  CaptureError { reason: String },

  #[error("name not found: {0}")]
  NameNotFound(String),

  #[error("name already exists: {0}")]
  NameAlreadyExists(String),

  #[error("name map error: {0}")]
  NameMapError(String),

  #[error("ref expired — call read_page again: {ref_id}")]
  RefExpired { ref_id: u32 },

  #[error("internal error: {0}")]
  Internal(String),
}

pub type ProbeResult<T> = Result<T, ProbeError>;

impl From<crate::registry::names::NameMapError> for ProbeError {
  fn from(err: crate::registry::names::NameMapError) -> Self {
    use crate::registry::names::NameMapError as E;
    match err {
      E::NotFound(n) => Self::NameNotFound(n),
      E::AlreadyExists(n) => Self::NameAlreadyExists(n),
      E::Load { .. } | E::Parse { .. } | E::Save { .. } => Self::NameMapError(err.to_string()),
    }
  }
}
