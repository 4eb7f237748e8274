//! JSON-RPC connection to the requester process
//!
//! One reader loop owns the receiving half of the transport. Inbound requests
//! are handed to a [`RequestHandler`] and their futures are driven by the
//! same loop, so every request gets its first poll before the next message is
//! read. A `$show` has begun its request slot by the time a following
//! `$setItems` is dispatched.
//!
//! ```text
//!   transport ─▶ reader loop ─▶ handler futures ─▶ responses ──┐
//!                    ├─▶ $cancelRequest ─▶ token               ▼
//!                    └─▶ responses ─▶ pending          outbound queue
//!   notify() / request() ─────────────────────────────▶     │
//!                                                            ▼
//!                                          writer task ─▶ transport
//! ```

use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{FuturesUnordered, StreamExt};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::error::{Result, RpcError};
use crate::protocol::{
    methods, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, Message, RequestId,
};
use crate::transport::{TransportParts, TransportSender};

/// Handles requests arriving from the requester
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// `cancel` fires when the requester sends `$cancelRequest` for this
    /// request or the connection goes away
    async fn handle_request(
        &self,
        request: JsonRpcRequest,
        cancel: CancellationToken,
    ) -> JsonRpcResponse;
}

type PendingMap = HashMap<RequestId, oneshot::Sender<Result<Value>>>;

pub struct Connection {
    outbound_tx: mpsc::UnboundedSender<Value>,
    outbound_rx: Mutex<Option<mpsc::UnboundedReceiver<Value>>>,
    pending: Arc<Mutex<PendingMap>>,
    next_id: AtomicI64,
    closed: CancellationToken,
}

#[derive(Deserialize)]
struct CancelParams {
    id: RequestId,
}

/// Removes a pending request whose caller stopped waiting
struct PendingGuard {
    pending: Arc<Mutex<PendingMap>>,
    id: Option<RequestId>,
}

impl PendingGuard {
    fn disarm(&mut self) {
        self.id = None;
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            self.pending.lock().remove(&id);
        }
    }
}

impl Connection {
    pub fn new() -> Arc<Self> {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            outbound_tx,
            outbound_rx: Mutex::new(Some(outbound_rx)),
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicI64::new(1),
            closed: CancellationToken::new(),
        })
    }

    fn next_id(&self) -> RequestId {
        RequestId::Number(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn enqueue(&self, message: Value) -> Result<()> {
        if self.closed.is_cancelled() {
            return Err(RpcError::ConnectionClosed);
        }
        self.outbound_tx
            .send(message)
            .map_err(|_| RpcError::ConnectionClosed)
    }

    /// Send a notification; does not wait for it to be written
    pub fn notify(&self, method: &str, params: Value) -> Result<()> {
        trace!(method, "Queueing notification");
        let notification = JsonRpcNotification::new(method, params);
        self.enqueue(serde_json::to_value(notification)?)
    }

    /// Send a request and wait for the matching response
    pub async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id.clone(), tx);
        let mut guard = PendingGuard {
            pending: Arc::clone(&self.pending),
            id: Some(id.clone()),
        };

        debug!(%id, method, "Sending request");
        let request = JsonRpcRequest::new(id, method).with_params(params);
        self.enqueue(serde_json::to_value(request)?)?;

        let result = rx.await.map_err(|_| RpcError::ConnectionClosed)?;
        guard.disarm();
        result
    }

    /// Stop the reader loop; in-flight requests are cancelled
    pub fn close(&self) {
        self.closed.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Serve `handler` until the transport closes or [`Connection::close`]
    /// is called
    pub async fn run<H>(self: &Arc<Self>, parts: TransportParts, handler: Arc<H>) -> Result<()>
    where
        H: RequestHandler + ?Sized,
    {
        let outbound_rx = self
            .outbound_rx
            .lock()
            .take()
            .ok_or_else(|| RpcError::Protocol("connection is already running".to_string()))?;

        let TransportParts { sender, mut receiver } = parts;
        let writer = tokio::spawn(write_loop(sender, outbound_rx, self.closed.clone()));

        let handler = &*handler;
        // Tokens carry the dispatch sequence so a reused id only ever clears its own entry
        let mut in_flight: HashMap<RequestId, (u64, CancellationToken)> = HashMap::new();
        let mut tasks: FuturesUnordered<BoxFuture<'_, (u64, JsonRpcResponse)>> =
            FuturesUnordered::new();
        let mut dispatched: u64 = 0;

        info!("Connection started");
        let outcome = loop {
            tokio::select! {
                biased;
                _ = self.closed.cancelled() => break Ok(()),
                Some((seq, response)) = tasks.next(), if !tasks.is_empty() => {
                    if in_flight.get(&response.id).is_some_and(|(current, _)| *current == seq) {
                        in_flight.remove(&response.id);
                    }
                    self.respond(response);
                }
                message = receiver.receive() => match message {
                    Ok(Some(value)) => match Message::parse(value) {
                        Ok(Message::Request(request)) => {
                            trace!(
                                id = %request.id,
                                method = %request.method,
                                "Dispatching request"
                            );
                            dispatched += 1;
                            let seq = dispatched;
                            let cancel = self.closed.child_token();
                            let entry = (seq, cancel.clone());
                            if let Some((_, previous)) = in_flight.insert(request.id.clone(), entry)
                            {
                                warn!(id = %request.id, "Request id reused while still in flight");
                                previous.cancel();
                            }
                            let response = handler.handle_request(request, cancel);
                            tasks.push(response.map(move |response| (seq, response)).boxed());
                        }
                        Ok(Message::Notification(notification)) => {
                            self.handle_notification(notification, &in_flight);
                        }
                        Ok(Message::Response(response)) => self.complete(response),
                        Err(e) => warn!(error = %e, "Dropping malformed message"),
                    },
                    Ok(None) => {
                        info!("Transport closed by peer");
                        break Ok(());
                    }
                    Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                        warn!(error = %e, "Dropping unreadable message");
                    }
                    Err(e) => break Err(RpcError::from(e)),
                },
            }
        };

        // Dropping the handler futures releases their call tokens
        for (_, token) in in_flight.values() {
            token.cancel();
        }
        drop(tasks);
        self.closed.cancel();
        self.fail_pending();

        if let Err(e) = writer.await {
            warn!(error = %e, "Writer task failed");
        }
        info!("Connection stopped");
        outcome
    }

    fn respond(&self, response: JsonRpcResponse) {
        let id = response.id.clone();
        let sent = serde_json::to_value(&response)
            .map_err(RpcError::from)
            .and_then(|value| self.enqueue(value));
        if let Err(e) = sent {
            warn!(%id, error = %e, "Failed to send response");
        }
    }

    fn handle_notification(
        &self,
        notification: JsonRpcNotification,
        in_flight: &HashMap<RequestId, (u64, CancellationToken)>,
    ) {
        match notification.method.as_str() {
            methods::CANCEL_REQUEST => {
                let params = notification.params.unwrap_or(Value::Null);
                match serde_json::from_value::<CancelParams>(params) {
                    Ok(CancelParams { id }) => match in_flight.get(&id) {
                        Some((_, token)) => {
                            debug!(%id, "Cancelling request");
                            token.cancel();
                        }
                        None => trace!(%id, "Cancel for a request that is not in flight"),
                    },
                    Err(e) => warn!(error = %e, "Invalid $cancelRequest params"),
                }
            }
            other => debug!(method = other, "Ignoring unknown notification"),
        }
    }

    fn complete(&self, response: JsonRpcResponse) {
        let Some(tx) = self.pending.lock().remove(&response.id) else {
            warn!(id = %response.id, "Response for an unknown request");
            return;
        };
        let _ = tx.send(response.into_result());
    }

    fn fail_pending(&self) {
        let pending: Vec<_> = self.pending.lock().drain().collect();
        if !pending.is_empty() {
            debug!(count = pending.len(), "Failing requests left without a response");
        }
        for (_, tx) in pending {
            let _ = tx.send(Err(RpcError::ConnectionClosed));
        }
    }
}

/// Drain the outbound queue into the transport until the connection closes
async fn write_loop(
    mut sender: Box<dyn TransportSender>,
    mut outbound_rx: mpsc::UnboundedReceiver<Value>,
    closed: CancellationToken,
) {
    loop {
        let message = tokio::select! {
            biased;
            message = outbound_rx.recv() => message,
            _ = closed.cancelled() => None,
        };
        let Some(message) = message else { break };
        if let Err(e) = sender.send(message).await {
            warn!(error = %e, "Failed to write message");
            closed.cancel();
            break;
        }
    }

    // Flush whatever was queued before the close
    while let Ok(message) = outbound_rx.try_recv() {
        if sender.send(message).await.is_err() {
            break;
        }
    }
    if let Err(e) = sender.close().await {
        debug!(error = %e, "Failed to close transport");
    }
}
