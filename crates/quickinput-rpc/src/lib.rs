//! QuickInput RPC - JSON-RPC 2.0 adapter for the quick input mediators
//!
//! Speaks line-delimited JSON-RPC with a requester process:
//! - `$show`, `$setItems`, `$setError`, `$input`, `$createOrUpdate` and
//!   `$dispose` requests are served by [`QuickOpenServer`]
//! - `$cancelRequest` notifications cancel in-flight requests
//! - `$onItemSelected`, `$onDidSelectItems` and `$validateInput` flow back
//!   through [`RemoteRequester`]

pub mod client;
pub mod connection;
pub mod error;
pub mod protocol;
pub mod server;
pub mod transport;

use std::sync::Arc;

use quickinput_core::{Config, QuickInputService, QuickOpen};

pub use client::RemoteRequester;
pub use connection::{Connection, RequestHandler};
pub use error::{Result, RpcError};
pub use protocol::{
    methods, JsonRpcError, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, RequestId,
};
pub use server::QuickOpenServer;
pub use transport::{line_transport, memory_pair, StdioTransport, TransportParts};

/// Serve a quick input service to the requester at the other end of
/// `transport` until the connection closes.
///
/// The proxy is shut down on the way out so no picker outlives the
/// connection.
pub async fn serve(
    service: Arc<dyn QuickInputService>,
    config: &Config,
    transport: TransportParts,
) -> Result<()> {
    let connection = Connection::new();
    let requester = Arc::new(RemoteRequester::new(Arc::clone(&connection)));
    let proxy = Arc::new(QuickOpen::new(service, requester).with_config(config));
    let server = Arc::new(QuickOpenServer::new(Arc::clone(&proxy)));

    let outcome = connection.run(transport, server).await;
    proxy.shutdown();
    outcome
}
