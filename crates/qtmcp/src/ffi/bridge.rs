//! `cxx` bridge declarations. The C++ side (`shim.cpp`/`shim.h`) is the only code in
//! this crate permitted to include Qt headers directly; everything else talks to Qt
//! through the safe wrappers in [`crate::ffi`].

#[cxx::bridge(namespace = "qtmcp_ffi")]
pub mod ffi {
  /// A `QVariant` flattened into a shape `cxx` can pass by value. `kind` drives which
  /// field is meaningful; `is_valid` is the uninitialized-variant bit (see
  /// [`crate::meta::variant`] for why this must stay separate from each payload's own
  /// "is this the default value" check).
  #[derive(Debug, Clone)]
  struct RawVariant {
    is_valid: bool,
    kind: VariantKind,
    i: i64,
    f: f64,
    b: bool,
    s: String,
    bytes: Vec<u8>,
    object_id: u64,
  }

  #[derive(Debug, Clone, Copy, PartialEq, Eq)]
  enum VariantKind {
    Invalid,
    Int,
    Double,
    Bool,
    String,
    ByteArray,
    Point,
    Size,
    Rect,
    Color,
    DateTime,
    Url,
    Enum,
    Object,
    Unknown,
  }

  struct PropertyMeta {
    name: String,
    type_name: String,
    writable: bool,
    resettable: bool,
    stored: bool,
    notify_signal: String,
  }

  struct MethodParam {
    type_name: String,
    name: String,
  }

  struct MethodMeta {
    name: String,
    params: Vec<MethodParam>,
    return_type: String,
    is_slot: bool,
  }

  struct SignalMeta {
    name: String,
    params: Vec<MethodParam>,
    meta_index: i32,
  }

  struct ObjectSnapshot {
    handle: u64,
    class_chain: Vec<String>,
    object_name: String,
    parent_handle: u64,
    child_handles: Vec<u64>,
  }

  unsafe extern "C++" {
    include!("qtmcp/src/ffi/shim.h");

    /// Compiled-in Qt version, as `(major << 16) | (minor << 8) | patch`.
    fn qt_runtime_version() -> u32;

    /// Installs the object-added/object-removed hooks, chaining to any previous
    /// installation. Must be called from the main thread after `QCoreApplication`
    /// exists.
    fn install_object_hooks(callback_ctx: usize) -> bool;
    fn uninstall_object_hooks();

    /// Registers a callback invoked once from the main thread's event loop the next
    /// time it runs an iteration (used to arm the app-startup hook without touching
    /// the framework during loader-lock).
    fn post_startup_callback(callback_ctx: usize);

    fn application_handle() -> u64;
    fn snapshot_object(handle: u64) -> ObjectSnapshot;
    fn is_handle_alive(handle: u64) -> bool;

    fn list_properties(handle: u64) -> Vec<PropertyMeta>;
    fn read_property(handle: u64, name: &str) -> RawVariant;
    fn write_property(handle: u64, name: &str, value: RawVariant) -> bool;
    fn write_property_converted(handle: u64, name: &str, value: RawVariant, declared_type: &str) -> bool;

    fn list_methods(handle: u64) -> Vec<MethodMeta>;
    fn invoke_method(handle: u64, name: &str, args: &[RawVariant]) -> Result<RawVariant>;

    fn list_signals(handle: u64) -> Vec<SignalMeta>;
    fn connect_signal(handle: u64, meta_index: i32, subscription_ctx: usize) -> bool;
    fn disconnect_signal(handle: u64, meta_index: i32, subscription_ctx: usize);

    fn is_widget(handle: u64) -> bool;
    fn widget_geometry(handle: u64) -> RawVariant; // VariantKind::Rect, window coords
    fn widget_is_visible(handle: u64) -> bool;
    fn widget_is_enabled(handle: u64) -> bool;
    fn top_level_widgets() -> Vec<u64>;
    fn hit_test(global_x: f64, global_y: f64) -> u64;
    fn hit_test_child(parent_handle: u64, local_x: f64, local_y: f64) -> u64;

    fn synth_mouse_event(handle: u64, kind: u8, local_x: f64, local_y: f64, button: u8) -> bool;
    fn synth_key_event(handle: u64, key_code: i32, modifiers: u32, press: bool) -> bool;
    fn synth_text_input(handle: u64, text: &str) -> bool;
    fn activate_and_raise(handle: u64);
    fn process_events_once();

    fn capture_widget_png(handle: u64) -> Vec<u8>;
    fn capture_window_png(handle: u64) -> Vec<u8>;
    fn capture_region_png(handle: u64, x: f64, y: f64, w: f64, h: f64) -> Vec<u8>;
    fn capture_screen_png(handle: u64) -> Vec<u8>;
    fn device_pixel_ratio(handle: u64) -> f64;

    fn install_message_handler(callback_ctx: usize) -> bool;

    fn post_null_event_ping(callback_ctx: usize, token: u64);
  }

  extern "Rust" {
    /// Called from C++ on the main thread when an object is created.
    fn on_object_added(callback_ctx: usize, handle: u64);
    /// Called from C++ on the main thread when an object is about to be destroyed.
    fn on_object_removed(callback_ctx: usize, handle: u64);
    /// Called once, the first time the event loop spins after `post_startup_callback`.
    fn on_startup(callback_ctx: usize);
    /// Called from the relay's slot with pre-serialized signal arguments.
    fn on_signal_emitted(subscription_ctx: usize, handle: u64, meta_index: i32, args: Vec<RawVariant>);
    /// Called from the installed `qInstallMessageHandler` callback.
    fn on_qt_message(callback_ctx: usize, level: u8, message: &str);
    /// Called when a posted null event round-trips back, completing a ping.
    fn on_ping_pong(callback_ctx: usize, token: u64);
  }
}
