/*! JSON-RPC-over-WebSocket transport for the qtmcp probe. */

mod discovery;
mod envelope;
mod rpc;
mod server;
mod vocab;

pub use discovery::{spawn_discovery_beacon, DiscoveryHandle};
pub use envelope::{Envelope, ErrorDescriptor};
pub use rpc::{dispatch, handle_frame, RpcRequest, RpcResponse};
pub use server::{start_server, start_server_with_shutdown, WebSocketState, DEFAULT_WS_PORT};
