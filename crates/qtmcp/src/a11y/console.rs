//! Console message capture (§4.8 `read_console_messages`). The capture buffer is a
//! function-local `static` — deliberately not a lazy-initialization macro — so its
//! construction is deterministic under the message handler's own startup dispatch
//! on platforms where that dispatch can race a module-level static's init order.

use crate::signals::now_ms;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::OnceLock;

const CAPACITY: usize = 2000;
const DEFAULT_LIMIT: usize = 50;

#[derive(Debug, Clone, Serialize)]
pub struct ConsoleMessage {
  pub level: String,
  pub message: String,
  pub timestamp_ms: u64,
}

fn level_name(level: u8) -> &'static str {
  match level {
    0 => "debug",
    1 => "warning",
    2 => "critical",
    3 => "fatal",
    4 => "info",
    _ => "unknown",
  }
}

fn store() -> &'static Mutex<VecDeque<ConsoleMessage>> {
  static STORE: OnceLock<Mutex<VecDeque<ConsoleMessage>>> = OnceLock::new();
  STORE.get_or_init(|| Mutex::new(VecDeque::with_capacity(CAPACITY)))
}

/// Called from the message-handler hook installed at startup.
pub fn record(level: u8, message: &str) {
  let mut buf = store().lock();
  if buf.len() == CAPACITY {
    buf.pop_front();
  }
  buf.push_back(ConsoleMessage {
    level: level_name(level).to_string(),
    message: message.to_string(),
    timestamp_ms: now_ms(),
  });
}

/// Newest-first, filtered by an exact (case-insensitive) level match and a
/// substring `pattern`, bounded by `limit` (defaults to 50).
pub fn read(level: Option<&str>, pattern: Option<&str>, limit: Option<usize>) -> Vec<ConsoleMessage> {
  let buf = store().lock();
  buf
    .iter()
    .rev()
    .filter(|m| level.map_or(true, |l| m.level.eq_ignore_ascii_case(l)))
    .filter(|m| pattern.map_or(true, |p| m.message.contains(p)))
    .take(limit.unwrap_or(DEFAULT_LIMIT))
    .cloned()
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  // Each test uses a distinct, very unlikely substring as a level/pattern filter so
  // the shared process-wide buffer from other tests doesn't leak into assertions.

  #[test]
  fn read_filters_by_level_and_pattern() {
    record(1, "zzqtest-widget overflow");
    record(2, "zzqtest-fatal crash imminent");
    let warnings = read(Some("warning"), Some("zzqtest-widget"), None);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].message, "zzqtest-widget overflow");
  }

  #[test]
  fn read_respects_limit_and_newest_first_order() {
    for n in 0..5 {
      record(0, &format!("zzqtest-order-{n}"));
    }
    let page = read(None, Some("zzqtest-order"), Some(2));
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].message, "zzqtest-order-4");
    assert_eq!(page[1].message, "zzqtest-order-3");
  }
}
