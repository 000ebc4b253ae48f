/*!
WebSocket server (§4.5): a single Qt-main-thread probe driving a single-client
JSON-RPC session. A second connection attempt is refused outright rather than
queued, since the probe has no notion of per-client isolation — two live clients
would both be mutating the same object graph through the same dispatcher.
*/

use crate::rpc;
use axum::{
  extract::{
    ws::{Message, WebSocket, WebSocketUpgrade},
    State,
  },
  response::Response,
  routing::get,
  Router,
};
use log::{error, info, warn};
use qtmcp::signals::ProbeEvent;
use qtmcp::Probe;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Default WebSocket server port (§6, `QTMCP_PORT`).
pub const DEFAULT_WS_PORT: u16 = 9222;

#[derive(Clone)]
pub struct WebSocketState {
  probe: Arc<Probe>,
  client_connected: Arc<AtomicBool>,
  bind_addr: String,
  port: u16,
}

impl std::fmt::Debug for WebSocketState {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("WebSocketState")
      .field("bind_addr", &self.bind_addr)
      .field("port", &self.port)
      .finish_non_exhaustive()
  }
}

impl WebSocketState {
  pub fn new(probe: Arc<Probe>, bind_addr: String, port: u16) -> Self {
    Self {
      probe,
      client_connected: Arc::new(AtomicBool::new(false)),
      bind_addr,
      port,
    }
  }
}

/// Binds and serves the WebSocket endpoint until the process exits. A bind
/// failure is fatal, since a probe nobody can connect to has no reason to keep
/// the host application running with hooks installed.
pub async fn start_server(ws_state: WebSocketState) {
  start_server_with_shutdown(ws_state, std::future::pending()).await;
}

/// As [`start_server`], but stops serving (without killing existing connections
/// mid-frame) once `shutdown` resolves — the loader's quit-signal wiring uses this
/// to unbind the port before the host process exits.
pub async fn start_server_with_shutdown(ws_state: WebSocketState, shutdown: impl std::future::Future<Output = ()> + Send + 'static) {
  let addr = format!("{}:{}", ws_state.bind_addr, ws_state.port);

  let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

  let app = Router::new().route("/", get(websocket_handler)).layer(cors).with_state(ws_state);

  let listener = match tokio::net::TcpListener::bind(&addr).await {
    Ok(listener) => listener,
    Err(e) => {
      error!("qtmcp: failed to bind WebSocket server to {addr}: {e}");
      return;
    }
  };

  print_banner(&addr);

  if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(shutdown).await {
    error!("qtmcp: WebSocket server failed: {e}");
  }
}

fn print_banner(addr: &str) {
  println!("qtmcp listening on ws://{addr}");
  info!("qtmcp: WebSocket server ready at ws://{addr}");
}

async fn websocket_handler(ws: WebSocketUpgrade, State(ws_state): State<WebSocketState>) -> Response {
  ws.on_upgrade(|socket| handle_websocket(socket, ws_state))
}

async fn handle_websocket(mut socket: WebSocket, ws_state: WebSocketState) {
  if ws_state.client_connected.swap(true, Ordering::SeqCst) {
    warn!("qtmcp: rejecting second client; only one session is served at a time");
    let _ = socket
      .send(Message::Text(
        json!({ "jsonrpc": "2.0", "error": { "code": -32000, "message": "another client is already connected" } })
          .to_string(),
      ))
      .await;
    let _ = socket.close().await;
    return;
  }

  info!("qtmcp: client connected");
  ws_state.probe.registry().lock().clear_numeric_refs();
  let mut events = ws_state.probe.signals().subscribe();

  loop {
    tokio::select! {
      msg = socket.recv() => {
        match msg {
          Some(Ok(Message::Text(text))) => {
            let probe = Arc::clone(&ws_state.probe);
            let response = tokio::task::spawn_blocking(move || rpc::handle_frame(&probe, &text)).await;
            let reply = match response {
              Ok(Some(r)) => Some(serde_json::to_string(&r).unwrap_or_default()),
              Ok(None) => None,
              Err(_) => Some(
                json!({
                  "jsonrpc": "2.0",
                  "id": Value::Null,
                  "error": { "code": -32603, "message": "dispatch task panicked" },
                })
                .to_string(),
              ),
            };
            if let Some(reply) = reply {
              if socket.send(Message::Text(reply)).await.is_err() {
                break;
              }
            }
          }
          Some(Ok(Message::Close(_))) | None => {
            info!("qtmcp: client disconnected");
            break;
          }
          Some(Err(e)) => {
            error!("qtmcp: WebSocket error: {e}");
            break;
          }
          _ => {}
        }
      }

      event = events.recv() => {
        match event {
          Ok(probe_event) => {
            let notification = notification_for(&probe_event);
            if socket.send(Message::Text(notification.to_string())).await.is_err() {
              break;
            }
          }
          Err(async_broadcast::RecvError::Overflowed(n)) => {
            warn!("qtmcp: client lagged, dropped {n} events");
          }
          Err(async_broadcast::RecvError::Closed) => break,
        }
      }
    }
  }

  ws_state.client_connected.store(false, Ordering::SeqCst);
}

/// Formats a probe-originated event as a JSON-RPC notification (no `id`; §4.5).
fn notification_for(event: &ProbeEvent) -> Value {
  match event {
    ProbeEvent::SignalEmitted {
      subscription_id,
      object_id,
      signal,
      args,
      timestamp_ms,
    } => json!({
      "jsonrpc": "2.0",
      "method": "qt.signal",
      "params": {
        "subscriptionId": subscription_id,
        "objectId": object_id,
        "signal": signal,
        "args": args,
        "timestamp": timestamp_ms,
      }
    }),
    ProbeEvent::ObjectCreated { object_id, class_name } => json!({
      "jsonrpc": "2.0",
      "method": "qt.objectCreated",
      "params": { "objectId": object_id, "className": class_name }
    }),
    ProbeEvent::ObjectDestroyed { object_id } => json!({
      "jsonrpc": "2.0",
      "method": "qt.objectDestroyed",
      "params": { "objectId": object_id }
    }),
    ProbeEvent::ConsoleMessage { level, message } => json!({
      "jsonrpc": "2.0",
      "method": "qt.consoleMessage",
      "params": { "level": level, "message": message }
    }),
  }
}
