/*!
Signal monitor (§4.4): subscription table, relay connections, lifecycle
notifications.

Every subscription's argument serialization and lifecycle-event fan-out goes
through one `async_broadcast` channel rather than writing to the transport
directly, so "a signal fired" is decoupled from "a client is currently connected."
*/

use crate::error::{ProbeError, ProbeResult};
use crate::ffi::{self, Handle, RawVariant};
use crate::meta::variant;
use async_broadcast::{InactiveReceiver, Sender};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A probe-originated event pushed to the transport as a JSON-RPC notification.
#[derive(Debug, Clone)]
pub enum ProbeEvent {
  SignalEmitted {
    subscription_id: String,
    object_id: String,
    signal: String,
    args: Vec<Value>,
    timestamp_ms: u64,
  },
  ObjectCreated {
    object_id: String,
    class_name: String,
  },
  ObjectDestroyed {
    object_id: String,
  },
  ConsoleMessage {
    level: u8,
    message: String,
  },
}

struct Subscription {
  handle: Handle,
  meta_index: i32,
  signal: String,
  ffi_ctx: usize,
}

const EVENT_CHANNEL_CAPACITY: usize = 2000;

/// Owns the subscription table and the event broadcast channel. One instance per
/// probe; cloning is cheap since the state lives behind an `Arc`.
#[derive(Clone)]
pub struct SignalMonitor {
  inner: Arc<Inner>,
}

struct Inner {
  subscriptions: Mutex<HashMap<String, Subscription>>,
  next_id: AtomicU64,
  events_tx: Sender<ProbeEvent>,
  events_keepalive: InactiveReceiver<ProbeEvent>,
  lifecycle_enabled: Mutex<bool>,
}

impl SignalMonitor {
  pub fn new() -> Self {
    let (mut tx, rx) = async_broadcast::broadcast(EVENT_CHANNEL_CAPACITY);
    tx.set_overflow(true);
    Self {
      inner: Arc::new(Inner {
        subscriptions: Mutex::new(HashMap::new()),
        next_id: AtomicU64::new(1),
        events_tx: tx,
        events_keepalive: rx.deactivate(),
        lifecycle_enabled: Mutex::new(false),
      }),
    }
  }

  pub fn subscribe(&self) -> async_broadcast::Receiver<ProbeEvent> {
    self.inner.events_keepalive.activate_cloned()
  }

  pub fn set_lifecycle_enabled(&self, enabled: bool) {
    *self.inner.lifecycle_enabled.lock() = enabled;
  }

  fn emit(&self, event: ProbeEvent) {
    let _ = self.inner.events_tx.try_broadcast(event);
  }

  /// Subscribes to `signal` on `object_id` (already resolved to a handle). Returns
  /// the opaque `sub_N` subscription id.
  pub fn subscribe_signal(&self, object_id: String, handle: Handle, signal: &str) -> ProbeResult<String> {
    let meta_index = crate::meta::find_signal_meta_index(handle, signal)?;
    let subscription_id = format!("sub_{}", self.inner.next_id.fetch_add(1, Ordering::Relaxed));

    let this = self.clone();
    let sub_id_for_relay = subscription_id.clone();
    let object_id_for_relay = object_id.clone();
    let signal_name = signal.to_string();

    let ctx = ffi::connect_signal(handle, meta_index, move |_handle, _meta_index, args: Vec<RawVariant>| {
      this.emit(ProbeEvent::SignalEmitted {
        subscription_id: sub_id_for_relay.clone(),
        object_id: object_id_for_relay.clone(),
        signal: signal_name.clone(),
        args: args.iter().map(variant::to_json).collect(),
        timestamp_ms: now_ms(),
      });
    })
    .ok_or_else(|| ProbeError::SignalNotFound {
      name: signal.to_string(),
    })?;

    self.inner.subscriptions.lock().insert(
      subscription_id.clone(),
      Subscription {
        handle,
        meta_index,
        signal: signal.to_string(),
        ffi_ctx: ctx,
      },
    );

    Ok(subscription_id)
  }

  pub fn unsubscribe(&self, subscription_id: &str) -> ProbeResult<()> {
    let sub = self
      .inner
      .subscriptions
      .lock()
      .remove(subscription_id)
      .ok_or_else(|| ProbeError::SubscriptionNotFound {
        id: subscription_id.to_string(),
      })?;
    ffi::disconnect_signal(sub.handle, sub.meta_index, sub.ffi_ctx);
    Ok(())
  }

  /// Called when the object-removed hook fires for a handle with live subscriptions;
  /// severs them without requiring an explicit unsubscribe.
  pub fn drop_subscriptions_for(&self, handle: Handle) {
    let mut subscriptions = self.inner.subscriptions.lock();
    subscriptions.retain(|_, sub| sub.handle != handle);
  }

  pub fn on_object_created(&self, object_id: String, class_name: String) {
    if *self.inner.lifecycle_enabled.lock() {
      self.emit(ProbeEvent::ObjectCreated { object_id, class_name });
    }
  }

  pub fn on_object_destroyed(&self, object_id: String) {
    if *self.inner.lifecycle_enabled.lock() {
      self.emit(ProbeEvent::ObjectDestroyed { object_id });
    }
  }

  pub fn on_console_message(&self, level: u8, message: String) {
    self.emit(ProbeEvent::ConsoleMessage { level, message });
  }
}

impl Default for SignalMonitor {
  fn default() -> Self {
    Self::new()
  }
}

pub(crate) fn now_ms() -> u64 {
  std::time::SystemTime::now()
    .duration_since(std::time::UNIX_EPOCH)
    .map(|d| d.as_millis() as u64)
    .unwrap_or(0)
}
