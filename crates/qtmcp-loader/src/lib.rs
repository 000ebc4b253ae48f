#![allow(unsafe_code)]

/*!
Injectable entry point (§4.1, §3): the only part of this workspace that runs
before a Qt application singleton exists. The process-attach handlers below do
as little as possible — arm the deferred-init hook and, on Windows, opt out of
per-thread attach notifications — because touching the registry, the FFI
bridge, or anything else that assumes a live `QApplication` this early would be
a use-after-free waiting to happen. Real initialization happens in
[`ensure_initialized`], called back once the host framework confirms its
application singleton exists.
*/

use parking_lot::Mutex;
use qtmcp::{ffi, Config, Probe};
use std::sync::OnceLock;
use tokio::sync::oneshot;

static INITIALIZED: OnceLock<()> = OnceLock::new();
static RUNTIME: OnceLock<tokio::runtime::Runtime> = OnceLock::new();
static SHUTDOWN: Mutex<Option<oneshot::Sender<()>>> = Mutex::new(None);

#[cfg(unix)]
#[ctor::ctor]
fn on_process_attach() {
  arm_deferred_init();
}

#[cfg(windows)]
#[no_mangle]
extern "system" fn DllMain(
  module: windows_sys::Win32::Foundation::HMODULE,
  reason: u32,
  _reserved: *mut core::ffi::c_void,
) -> windows_sys::Win32::Foundation::BOOL {
  const DLL_PROCESS_ATTACH: u32 = 1;
  if reason == DLL_PROCESS_ATTACH {
    // A one-shot probe has no use for per-thread attach/detach notifications,
    // and declining them avoids extra DllMain re-entrancy while other threads
    // in the host process start up.
    unsafe {
      windows_sys::Win32::System::SystemServices::DisableThreadLibraryCalls(module);
    }
    arm_deferred_init();
  }
  1
}

/// Arms the framework's application-startup hook. Does not touch `Probe`,
/// `Registry`, or any other live state — the callback runs later, after the
/// application singleton exists.
fn arm_deferred_init() {
  ffi::post_startup_callback(ensure_initialized);
}

/// The real initializer (§4.1). Runs exactly once regardless of how many times
/// the startup hook fires; every failure here is logged and absorbed rather
/// than propagated, since a probe that can't start must never take the host
/// application down with it.
fn ensure_initialized() {
  if INITIALIZED.set(()).is_err() {
    return;
  }

  init_logging();

  let config = Config::from_env();
  if !config.enabled {
    log::info!("qtmcp: QTMCP_ENABLED=0, probe stays dormant");
    return;
  }

  let application = ffi::application_handle();
  let probe = Probe::new(application, config.clone());
  probe.install_hooks();

  let runtime = match tokio::runtime::Builder::new_multi_thread()
    .worker_threads(2)
    .enable_all()
    .thread_name("qtmcp-transport")
    .build()
  {
    Ok(runtime) => runtime,
    Err(e) => {
      log::error!("qtmcp: failed to start the transport runtime, probe stays dormant: {e}");
      return;
    }
  };

  let ws_state = qtmcp_ws::WebSocketState::new(probe, config.bind_addr.clone(), config.ws_port);
  let (shutdown_tx, shutdown_rx) = oneshot::channel();
  *SHUTDOWN.lock() = Some(shutdown_tx);

  let ws_port = config.ws_port;
  let discovery_port = config.discovery_port;
  runtime.spawn(async move {
    let discovery = qtmcp_ws::spawn_discovery_beacon(ws_port, discovery_port);
    let shutdown = async move {
      let _ = shutdown_rx.await;
      discovery.shutdown().await;
    };
    qtmcp_ws::start_server_with_shutdown(ws_state, shutdown).await;
  });

  install_quit_hook(application);

  if std::env::var("QTMCP_QUIET").as_deref() != Ok("1") {
    println!("qtmcp: attached to pid {} (ws ws://{}:{})", std::process::id(), config.bind_addr, config.ws_port);
  }
  log::info!(
    "qtmcp: attached, ws_port={} discovery_port={} mode={:?}",
    config.ws_port,
    config.discovery_port,
    config.mode
  );

  // Keeps the runtime (and its worker threads) alive for the rest of the
  // process; nothing else holds a reference to it once this function returns.
  let _ = RUNTIME.set(runtime);
}

/// Connects a raw signal relay to the application's `aboutToQuit`-equivalent
/// signal so the WebSocket listener and the discovery beacon wind down before
/// the host process exits, instead of a stale announcement sitting around
/// until a discoverer's timeout expires. Goes through `ffi::list_signals`
/// directly rather than the registry's subscription table, since this callback
/// drives shutdown rather than producing a client-visible notification.
fn install_quit_hook(application: ffi::Handle) {
  let meta_index = ffi::list_signals(application)
    .into_iter()
    .find(|signal| signal.name == "aboutToQuit")
    .map(|signal| signal.meta_index);

  let Some(meta_index) = meta_index else {
    log::warn!("qtmcp: aboutToQuit signal not found; shutdown will not flush the discovery beacon");
    return;
  };

  let connected = ffi::connect_signal(application, meta_index, |_handle, _meta_index, _args| {
    if let Some(tx) = SHUTDOWN.lock().take() {
      let _ = tx.send(());
    }
  });

  if connected.is_none() {
    log::warn!("qtmcp: failed to connect to aboutToQuit; shutdown will not flush the discovery beacon");
  }
}

/// Installs a logger unless the host process already has one. `RUST_LOG`
/// overrides the default filter; `qtmcp=info` is otherwise a quiet-but-useful
/// default for a library that lives inside someone else's process.
fn init_logging() {
  let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "qtmcp=info".to_string());
  let mut builder = env_logger::Builder::new();
  builder.parse_filters(&filter);
  if builder.try_init().is_err() {
    log::debug!("qtmcp: a logger was already installed; reusing it");
  }
}
