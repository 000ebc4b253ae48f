/*!
qtmcp - in-process instrumentation core for Qt applications.

```ignore
use qtmcp::{Config, Probe};

// Called once from the deferred-init hook, on the Qt main thread, after the
// application singleton exists.
let probe = Probe::new(qtmcp::ffi::application_handle(), Config::from_env());
probe.install_hooks();

// Everything else — object lookup, property/method/signal access, input
// synthesis, the accessibility tree — goes through the probe.
let handle = probe.registry().lock().resolve("MainWindow/QPushButton#submit")?;
let value = qtmcp::meta::get_property(handle, "text")?;
```

This crate owns the registry, meta-inspection, signal monitor, input/screenshot,
and accessibility layers. It knows nothing about JSON-RPC framing or WebSockets —
that lives in the sibling transport crate, which drives this one.
*/

pub mod a11y;
pub mod config;
pub mod error;
pub mod ffi;
pub mod ids;
pub mod input;
pub mod meta;
pub mod registry;
pub mod screenshot;
pub mod signals;

pub use config::Config;
pub use error::{ProbeError, ProbeResult};
pub use ffi::Handle;

use a11y::AccessibilityTree;
use ids::NumericRefCounter;
use parking_lot::Mutex;
use registry::Registry;
use signals::SignalMonitor;
use std::sync::Arc;

/// Owns every piece of per-process probe state: the object registry, the signal
/// monitor, and the accessibility-tree ref table. One instance is created by
/// `ensureInitialized()` and lives for the process's remaining lifetime; the
/// transport crate holds an `Arc<Probe>` and never constructs its own copy.
pub struct Probe {
  registry: Mutex<Registry>,
  signals: SignalMonitor,
  a11y: AccessibilityTree,
  config: Config,
  object_hooks_ctx: Mutex<Option<usize>>,
}

impl Probe {
  /// Creates the probe state for an already-running application singleton.
  /// Does not install hooks by itself — see [`Probe::install_hooks`], which the
  /// loader calls separately once it has confirmed this process should be
  /// instrumented at all.
  pub fn new(application: Handle, config: Config) -> Arc<Self> {
    let numeric_counter = Arc::new(NumericRefCounter::new());
    Arc::new(Self {
      registry: Mutex::new(Registry::new(application, numeric_counter)),
      signals: SignalMonitor::new(),
      a11y: AccessibilityTree::new(),
      config,
      object_hooks_ctx: Mutex::new(None),
    })
  }

  /// Installs the object lifecycle hooks and the console message handler.
  /// Idempotent: a second call replaces the first registration rather than
  /// stacking relays.
  pub fn install_hooks(self: &Arc<Self>) {
    let added_probe = Arc::clone(self);
    let removed_probe = Arc::clone(self);
    let ctx = ffi::install_object_hooks(
      move |handle| {
        added_probe.registry.lock().on_object_added(handle);
        let class_name = ffi::snapshot(handle).class_chain.into_iter().next().unwrap_or_default();
        let object_id = added_probe.registry.lock().hierarchical_id(handle);
        added_probe.signals.on_object_created(object_id, class_name);
      },
      move |handle| {
        let object_id = removed_probe.registry.lock().hierarchical_id(handle);
        removed_probe.signals.drop_subscriptions_for(handle);
        removed_probe.registry.lock().on_object_removed(handle);
        removed_probe.signals.on_object_destroyed(object_id);
      },
    );
    *self.object_hooks_ctx.lock() = Some(ctx);

    let message_probe = Arc::clone(self);
    ffi::install_message_handler(move |level, message| {
      a11y::console::record(level, message);
      message_probe.signals.on_console_message(level, message.to_string());
    });
  }

  pub fn registry(&self) -> &Mutex<Registry> {
    &self.registry
  }

  pub fn signals(&self) -> &SignalMonitor {
    &self.signals
  }

  pub fn a11y(&self) -> &AccessibilityTree {
    &self.a11y
  }

  pub const fn config(&self) -> &Config {
    &self.config
  }
}

impl Drop for Probe {
  fn drop(&mut self) {
    if let Some(ctx) = self.object_hooks_ctx.lock().take() {
      ffi::uninstall_object_hooks(ctx);
    }
  }
}
