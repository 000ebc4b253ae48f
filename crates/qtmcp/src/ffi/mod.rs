//! Safe Rust surface over the Qt reflection API.
//!
//! Every function in [`bridge::ffi`] that touches an internal (non-public) Qt symbol
//! is called from exactly one place below and nowhere else in the crate — callers
//! never see a `cxx` type. The only version branch Qt 5 vs. Qt 6 differences need is
//! compiled into `shim.cpp`; this module is identical on both.

#![allow(unsafe_code)]

mod bridge;

pub use bridge::ffi::{
  MethodMeta, MethodParam, ObjectSnapshot, PropertyMeta, RawVariant, SignalMeta, VariantKind,
};

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

/// Opaque handle to a live `QObject`. Identity is the object's address; validity
/// must be checked with [`is_alive`] before every use because the registry's
/// pointer index and the framework's own object lifetime are not synchronized by
/// anything stronger than the object-added/object-removed hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(pub u64);

impl Handle {
  pub const NULL: Handle = Handle(0);

  pub const fn is_null(self) -> bool {
    self.0 == 0
  }
}

type ObjectAddedFn = Box<dyn Fn(Handle) + Send + Sync>;
type ObjectRemovedFn = Box<dyn Fn(Handle) + Send + Sync>;
type SignalFn = Box<dyn Fn(Handle, i32, Vec<RawVariant>) + Send + Sync>;
type MessageFn = Box<dyn Fn(u8, &str) + Send + Sync>;
type StartupFn = Box<dyn FnOnce() + Send>;
type PingFn = Box<dyn Fn(u64) + Send + Sync>;

#[derive(Default)]
struct Callbacks {
  next_ctx: AtomicUsize,
  object_hooks: Mutex<HashMap<usize, (ObjectAddedFn, ObjectRemovedFn)>>,
  startup: Mutex<HashMap<usize, Option<StartupFn>>>,
  signals: Mutex<HashMap<usize, SignalFn>>,
  messages: Mutex<HashMap<usize, MessageFn>>,
  pings: Mutex<HashMap<usize, PingFn>>,
}

fn callbacks() -> &'static Callbacks {
  static CALLBACKS: OnceLock<Callbacks> = OnceLock::new();
  CALLBACKS.get_or_init(Callbacks::default)
}

fn next_ctx() -> usize {
  callbacks().next_ctx.fetch_add(1, Ordering::Relaxed) + 1
}

/// Compiled-in Qt version as `(major, minor, patch)`.
pub fn qt_version() -> (u32, u32, u32) {
  let packed = bridge::ffi::qt_runtime_version();
  ((packed >> 16) & 0xff, (packed >> 8) & 0xff, packed & 0xff)
}

/// Installs the object lifecycle hooks. Must run on the main thread after the
/// application singleton exists. Returns the context id used to unregister later.
pub fn install_object_hooks(
  on_added: impl Fn(Handle) + Send + Sync + 'static,
  on_removed: impl Fn(Handle) + Send + Sync + 'static,
) -> usize {
  let ctx = next_ctx();
  callbacks()
    .object_hooks
    .lock()
    .insert(ctx, (Box::new(on_added), Box::new(on_removed)));
  bridge::ffi::install_object_hooks(ctx);
  ctx
}

pub fn uninstall_object_hooks(ctx: usize) {
  callbacks().object_hooks.lock().remove(&ctx);
  bridge::ffi::uninstall_object_hooks();
}

/// Arms a one-shot callback for the framework's application-startup hook.
pub fn post_startup_callback(on_startup: impl FnOnce() + Send + 'static) {
  let ctx = next_ctx();
  callbacks()
    .startup
    .lock()
    .insert(ctx, Some(Box::new(on_startup)));
  bridge::ffi::post_startup_callback(ctx);
}

pub fn application_handle() -> Handle {
  Handle(bridge::ffi::application_handle())
}

pub fn snapshot(handle: Handle) -> ObjectSnapshot {
  bridge::ffi::snapshot_object(handle.0)
}

pub fn is_alive(handle: Handle) -> bool {
  !handle.is_null() && bridge::ffi::is_handle_alive(handle.0)
}

pub fn list_properties(handle: Handle) -> Vec<PropertyMeta> {
  bridge::ffi::list_properties(handle.0)
}

pub fn read_property(handle: Handle, name: &str) -> RawVariant {
  bridge::ffi::read_property(handle.0, name)
}

pub fn write_property(handle: Handle, name: &str, value: RawVariant) -> bool {
  bridge::ffi::write_property(handle.0, name, value)
}

/// Retries a refused direct assignment by first converting the variant to the
/// property's declared type-id, then assigning the converted value.
pub fn write_property_converted(handle: Handle, name: &str, value: RawVariant, declared_type: &str) -> bool {
  bridge::ffi::write_property_converted(handle.0, name, value, declared_type)
}

pub fn list_methods(handle: Handle) -> Vec<MethodMeta> {
  bridge::ffi::list_methods(handle.0)
}

pub fn invoke_method(handle: Handle, name: &str, args: &[RawVariant]) -> Result<RawVariant, String> {
  bridge::ffi::invoke_method(handle.0, name, args).map_err(|e| e.to_string())
}

pub fn list_signals(handle: Handle) -> Vec<SignalMeta> {
  bridge::ffi::list_signals(handle.0)
}

/// Connects a relay for `meta_index` on `handle`. `on_emit` receives the already
/// variant-boxed argument list every time the signal fires.
pub fn connect_signal(
  handle: Handle,
  meta_index: i32,
  on_emit: impl Fn(Handle, i32, Vec<RawVariant>) + Send + Sync + 'static,
) -> Option<usize> {
  let ctx = next_ctx();
  callbacks().signals.lock().insert(ctx, Box::new(on_emit));
  if bridge::ffi::connect_signal(handle.0, meta_index, ctx) {
    Some(ctx)
  } else {
    callbacks().signals.lock().remove(&ctx);
    None
  }
}

pub fn disconnect_signal(handle: Handle, meta_index: i32, ctx: usize) {
  bridge::ffi::disconnect_signal(handle.0, meta_index, ctx);
  callbacks().signals.lock().remove(&ctx);
}

pub fn is_widget(handle: Handle) -> bool {
  bridge::ffi::is_widget(handle.0)
}

pub fn widget_is_visible(handle: Handle) -> bool {
  bridge::ffi::widget_is_visible(handle.0)
}

pub fn widget_is_enabled(handle: Handle) -> bool {
  bridge::ffi::widget_is_enabled(handle.0)
}

pub fn top_level_widgets() -> Vec<Handle> {
  bridge::ffi::top_level_widgets()
    .into_iter()
    .map(Handle)
    .collect()
}

pub fn hit_test(global_x: f64, global_y: f64) -> Option<Handle> {
  let h = bridge::ffi::hit_test(global_x, global_y);
  (h != 0).then_some(Handle(h))
}

pub fn hit_test_child(parent: Handle, local_x: f64, local_y: f64) -> Option<Handle> {
  let h = bridge::ffi::hit_test_child(parent.0, local_x, local_y);
  (h != 0).then_some(Handle(h))
}

pub fn synth_mouse_event(handle: Handle, kind: u8, local_x: f64, local_y: f64, button: u8) -> bool {
  bridge::ffi::synth_mouse_event(handle.0, kind, local_x, local_y, button)
}

pub fn synth_key_event(handle: Handle, key_code: i32, modifiers: u32, press: bool) -> bool {
  bridge::ffi::synth_key_event(handle.0, key_code, modifiers, press)
}

pub fn synth_text_input(handle: Handle, text: &str) -> bool {
  bridge::ffi::synth_text_input(handle.0, text)
}

pub fn activate_and_raise(handle: Handle) {
  bridge::ffi::activate_and_raise(handle.0);
}

pub fn process_events_once() {
  bridge::ffi::process_events_once();
}

pub fn capture_widget_png(handle: Handle) -> Vec<u8> {
  bridge::ffi::capture_widget_png(handle.0)
}

pub fn capture_window_png(handle: Handle) -> Vec<u8> {
  bridge::ffi::capture_window_png(handle.0)
}

pub fn capture_region_png(handle: Handle, x: f64, y: f64, w: f64, h: f64) -> Vec<u8> {
  bridge::ffi::capture_region_png(handle.0, x, y, w, h)
}

pub fn capture_screen_png(handle: Handle) -> Vec<u8> {
  bridge::ffi::capture_screen_png(handle.0)
}

pub fn device_pixel_ratio(handle: Handle) -> f64 {
  bridge::ffi::device_pixel_ratio(handle.0)
}

pub fn install_message_handler(on_message: impl Fn(u8, &str) + Send + Sync + 'static) {
  let ctx = next_ctx();
  callbacks().messages.lock().insert(ctx, Box::new(on_message));
  bridge::ffi::install_message_handler(ctx);
}

/// Posts a null event and fires `on_pong` once it round-trips through the event
/// loop; used to measure `qt.ping`'s event-loop latency (§ ping semantics: post,
/// timestamp, measure wall-clock round trip on pong).
pub fn ping(token: u64, on_pong: impl Fn(u64) + Send + Sync + 'static) {
  let ctx = next_ctx();
  callbacks().pings.lock().insert(ctx, Box::new(on_pong));
  bridge::ffi::post_null_event_ping(ctx, token);
}

// extern "Rust" entry points invoked from shim.cpp.

fn on_object_added(callback_ctx: usize, handle: u64) {
  if let Some((added, _)) = callbacks().object_hooks.lock().get(&callback_ctx) {
    added(Handle(handle));
  }
}

fn on_object_removed(callback_ctx: usize, handle: u64) {
  if let Some((_, removed)) = callbacks().object_hooks.lock().get(&callback_ctx) {
    removed(Handle(handle));
  }
}

fn on_startup(callback_ctx: usize) {
  if let Some(slot) = callbacks().startup.lock().get_mut(&callback_ctx) {
    if let Some(f) = slot.take() {
      f();
    }
  }
}

fn on_signal_emitted(subscription_ctx: usize, handle: u64, meta_index: i32, args: Vec<RawVariant>) {
  if let Some(f) = callbacks().signals.lock().get(&subscription_ctx) {
    f(Handle(handle), meta_index, args);
  }
}

fn on_qt_message(callback_ctx: usize, level: u8, message: &str) {
  if let Some(f) = callbacks().messages.lock().get(&callback_ctx) {
    f(level, message);
  }
}

fn on_ping_pong(callback_ctx: usize, token: u64) {
  if let Some(f) = callbacks().pings.lock().remove(&callback_ctx) {
    f(token);
  }
}
