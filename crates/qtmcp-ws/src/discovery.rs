/*!
UDP discovery beacon (§4.1, §6): announces this probe's WebSocket endpoint on the
local network every five seconds so a launcher can find an injected process
without being told its port in advance, and sends a goodbye datagram on shutdown
so discoverers don't have to wait out a stale-announcement timeout.
*/

use log::warn;
use serde::Serialize;
use serde_json::json;
use std::net::Ipv4Addr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

const ANNOUNCE_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum Beacon<'a> {
  #[serde(rename_all = "camelCase")]
  Announce { ws_port: u16, pid: u32, version: &'a str },
  #[serde(rename_all = "camelCase")]
  Goodbye { ws_port: u16, pid: u32 },
}

/// A running beacon task. Dropping this without calling [`DiscoveryHandle::shutdown`]
/// just leaks the background task until process exit — acceptable during loader
/// teardown, which tears down the whole process anyway — but an orderly shutdown
/// should call it so listeners see the goodbye promptly.
pub struct DiscoveryHandle {
  shutdown_tx: Option<oneshot::Sender<()>>,
  join: JoinHandle<()>,
}

impl DiscoveryHandle {
  pub async fn shutdown(mut self) {
    if let Some(tx) = self.shutdown_tx.take() {
      let _ = tx.send(());
    }
    let _ = self.join.await;
  }
}

/// Spawns the announce loop. `discovery_port` is the broadcast destination
/// (`QTMCP_DISCOVERY_PORT`, default 9221); the beacon binds its own socket to an
/// ephemeral source port.
pub fn spawn_discovery_beacon(ws_port: u16, discovery_port: u16) -> DiscoveryHandle {
  let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
  let pid = std::process::id();

  let join = tokio::spawn(async move {
    let socket = match UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await {
      Ok(socket) => socket,
      Err(e) => {
        warn!("qtmcp: discovery beacon disabled, could not bind UDP socket: {e}");
        return;
      }
    };
    if let Err(e) = socket.set_broadcast(true) {
      warn!("qtmcp: discovery beacon disabled, could not enable broadcast: {e}");
      return;
    }
    let destination = (Ipv4Addr::BROADCAST, discovery_port);

    send(&socket, destination, &Beacon::Announce { ws_port, pid, version: env!("CARGO_PKG_VERSION") }).await;

    loop {
      tokio::select! {
        _ = tokio::time::sleep(ANNOUNCE_INTERVAL) => {
          send(&socket, destination, &Beacon::Announce { ws_port, pid, version: env!("CARGO_PKG_VERSION") }).await;
        }
        _ = &mut shutdown_rx => {
          send(&socket, destination, &Beacon::Goodbye { ws_port, pid }).await;
          break;
        }
      }
    }
  });

  DiscoveryHandle {
    shutdown_tx: Some(shutdown_tx),
    join,
  }
}

async fn send(socket: &UdpSocket, destination: (Ipv4Addr, u16), beacon: &Beacon<'_>) {
  let payload = json!(beacon).to_string();
  if let Err(e) = socket.send_to(payload.as_bytes(), destination).await {
    warn!("qtmcp: discovery beacon send failed: {e}");
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn announce_serializes_with_a_kind_tag() {
    let beacon = Beacon::Announce { ws_port: 9222, pid: 1, version: "0.1.0" };
    let value = json!(beacon);
    assert_eq!(value["kind"], "announce");
    assert_eq!(value["wsPort"], 9222);
  }

  #[test]
  fn goodbye_serializes_with_a_kind_tag() {
    let beacon = Beacon::Goodbye { ws_port: 9222, pid: 1 };
    let value = json!(beacon);
    assert_eq!(value["kind"], "goodbye");
  }
}
