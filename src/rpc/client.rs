//! WebSocket JSON-RPC client.
//!
//! # Responsibilities
//! - Own the socket in a single background task
//! - Correlate responses with requests by id
//! - Route subscription notifications to per-subscription streams
//! - Unsubscribe on drop and on shutdown
//!
//! # Data Flow
//! ```text
//! RpcClient::request / subscribe
//!     → Instruction (mpsc) → backend task → socket
//! socket → backend task
//!     → pending oneshot (responses)
//!     → subscription mpsc (notifications)
//! ```

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Mutex;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::{SinkExt, Stream, StreamExt};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::observability::metrics;
use crate::resilience::deadline;
use crate::rpc::types::{subscription_key, IncomingFrame, RequestFrame, RpcError, RpcResult};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;
type SubscribeReply = RpcResult<(String, mpsc::UnboundedReceiver<Value>)>;

/// Instructions for the backend task.
enum Instruction {
    /// Send a request and deliver its result.
    Request {
        method: String,
        params: Value,
        respond: oneshot::Sender<RpcResult<Value>>,
    },
    /// Open a subscription.
    Subscribe {
        method: String,
        params: Value,
        unsubscribe: String,
        respond: oneshot::Sender<SubscribeReply>,
    },
    /// Cancel a subscription by its server id.
    Unsubscribe { subscription: String },
    /// Unsubscribe everything, close the socket and stop.
    Shutdown { done: oneshot::Sender<()> },
}

/// Handle to a node connection. Cheap to share behind an `Arc`.
pub struct RpcClient {
    endpoint: String,
    to_backend: mpsc::UnboundedSender<Instruction>,
    request_timeout: Duration,
    backend: Mutex<Option<JoinHandle<()>>>,
}

impl RpcClient {
    /// Open a WebSocket session to `endpoint`.
    pub async fn connect(
        endpoint: &str,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> RpcResult<Self> {
        let (socket, _response) = deadline(connect_timeout, tokio_tungstenite::connect_async(endpoint))
            .await
            .map_err(|_| RpcError::Timeout {
                method: "connect".to_string(),
                secs: connect_timeout.as_secs(),
            })?
            .map_err(|e| RpcError::Transport(format!("connect to {} failed: {}", endpoint, e)))?;

        tracing::debug!(endpoint = %endpoint, "WebSocket session open");

        let (to_backend, from_frontend) = mpsc::unbounded_channel();
        let backend = Backend::new(socket, from_frontend);
        let handle = tokio::spawn(backend.run());

        Ok(Self {
            endpoint: endpoint.to_string(),
            to_backend,
            request_timeout,
            backend: Mutex::new(Some(handle)),
        })
    }

    /// Endpoint this client is connected to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send a request and decode its result.
    pub async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> RpcResult<T> {
        let value = self.request_raw(method, params).await;
        metrics::record_rpc_request(method, value.is_ok());
        serde_json::from_value(value?)
            .map_err(|e| RpcError::Decode(format!("{} result: {}", method, e)))
    }

    async fn request_raw(&self, method: &str, params: Value) -> RpcResult<Value> {
        let (respond, response) = oneshot::channel();
        self.to_backend
            .send(Instruction::Request {
                method: method.to_string(),
                params,
                respond,
            })
            .map_err(|_| RpcError::ConnectionClosed)?;

        tracing::trace!(method = method, "RPC request sent");
        self.await_reply(method, response).await?
    }

    /// Open a subscription; notifications arrive on the returned stream.
    pub async fn subscribe(
        &self,
        method: &str,
        params: Value,
        unsubscribe_method: &str,
    ) -> RpcResult<Subscription> {
        let (respond, response) = oneshot::channel();
        self.to_backend
            .send(Instruction::Subscribe {
                method: method.to_string(),
                params,
                unsubscribe: unsubscribe_method.to_string(),
                respond,
            })
            .map_err(|_| RpcError::ConnectionClosed)?;

        let reply = self.await_reply(method, response).await?;
        metrics::record_rpc_request(method, reply.is_ok());
        let (id, items) = reply?;
        tracing::debug!(method = method, subscription = %id, "Subscribed");

        Ok(Subscription {
            id,
            items,
            to_backend: self.to_backend.clone(),
        })
    }

    async fn await_reply<T>(&self, method: &str, response: oneshot::Receiver<T>) -> RpcResult<T> {
        match deadline(self.request_timeout, response).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(RpcError::ConnectionClosed),
            Err(_) => Err(RpcError::Timeout {
                method: method.to_string(),
                secs: self.request_timeout.as_secs(),
            }),
        }
    }

    /// Cancel open subscriptions, close the socket and wait for the backend.
    pub async fn close(&self) {
        let (done, closed) = oneshot::channel();
        if self.to_backend.send(Instruction::Shutdown { done }).is_ok() {
            let _ = deadline(self.request_timeout, closed).await;
        }

        let handle = self.backend.lock().ok().and_then(|mut guard| guard.take());
        if let Some(handle) = handle {
            if deadline(self.request_timeout, handle).await.is_err() {
                tracing::warn!(endpoint = %self.endpoint, "RPC backend did not stop in time");
            }
        }
        tracing::debug!(endpoint = %self.endpoint, "WebSocket session closed");
    }
}

impl Drop for RpcClient {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.backend.lock() {
            if let Some(handle) = guard.take() {
                handle.abort();
            }
        }
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("endpoint", &self.endpoint)
            .field("connected", &!self.to_backend.is_closed())
            .finish()
    }
}

/// Stream of notification payloads for one subscription.
///
/// Dropping it cancels the subscription on the node.
pub struct Subscription {
    id: String,
    items: mpsc::UnboundedReceiver<Value>,
    to_backend: mpsc::UnboundedSender<Instruction>,
}

impl Stream for Subscription {
    type Item = Value;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Value>> {
        self.get_mut().items.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let _ = self.to_backend.send(Instruction::Unsubscribe {
            subscription: self.id.clone(),
        });
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// Requests awaiting a response, by request id.
enum Pending {
    Call(oneshot::Sender<RpcResult<Value>>),
    Subscribe {
        unsubscribe: String,
        respond: oneshot::Sender<SubscribeReply>,
    },
    Unsubscribe,
}

impl Pending {
    /// The caller stopped waiting, usually after its request timed out.
    fn is_abandoned(&self) -> bool {
        match self {
            Pending::Call(respond) => respond.is_closed(),
            Pending::Subscribe { respond, .. } => respond.is_closed(),
            Pending::Unsubscribe => false,
        }
    }
}

/// Drop requests nobody waits for any more; returns how many were dropped.
fn sweep_abandoned(pending: &mut HashMap<u64, Pending>) -> usize {
    let before = pending.len();
    pending.retain(|_, p| !p.is_abandoned());
    before - pending.len()
}

struct ActiveSubscription {
    unsubscribe: String,
    sink: mpsc::UnboundedSender<Value>,
}

/// Owner of the socket.
struct Backend {
    socket: Socket,
    from_frontend: mpsc::UnboundedReceiver<Instruction>,
    pending: HashMap<u64, Pending>,
    subscriptions: HashMap<String, ActiveSubscription>,
    next_id: u64,
}

impl Backend {
    fn new(socket: Socket, from_frontend: mpsc::UnboundedReceiver<Instruction>) -> Self {
        Self {
            socket,
            from_frontend,
            pending: HashMap::new(),
            subscriptions: HashMap::new(),
            next_id: 1,
        }
    }

    async fn run(mut self) {
        loop {
            tokio::select! {
                instruction = self.from_frontend.recv() => {
                    match instruction {
                        Some(Instruction::Shutdown { done }) => {
                            self.shutdown().await;
                            let _ = done.send(());
                            break;
                        }
                        Some(instruction) => {
                            if let Err(e) = self.handle_instruction(instruction).await {
                                tracing::warn!(error = %e, "Failed to write to socket");
                                break;
                            }
                        }
                        None => {
                            self.shutdown().await;
                            break;
                        }
                    }
                }
                frame = self.socket.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => self.handle_frame(text.as_str()).await,
                        Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                            Ok(text) => self.handle_frame(text).await,
                            Err(_) => tracing::warn!("Ignoring non-UTF-8 binary frame"),
                        },
                        Some(Ok(Message::Close(frame))) => {
                            tracing::info!(reason = ?frame, "Node closed the connection");
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            tracing::warn!(error = %e, "WebSocket read failed");
                            break;
                        }
                        None => break,
                    }
                }
            }
        }

        self.fail_pending();
    }

    fn allocate_id(&mut self) -> u64 {
        let swept = sweep_abandoned(&mut self.pending);
        if swept > 0 {
            tracing::debug!(count = swept, "Dropped requests whose callers gave up");
        }
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    async fn send(&mut self, id: u64, method: &str, params: &Value) -> RpcResult<()> {
        let frame = RequestFrame::new(id, method, params);
        let text = serde_json::to_string(&frame).map_err(|e| RpcError::Decode(e.to_string()))?;
        self.socket
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))
    }

    async fn handle_instruction(&mut self, instruction: Instruction) -> RpcResult<()> {
        match instruction {
            Instruction::Request { method, params, respond } => {
                let id = self.allocate_id();
                self.pending.insert(id, Pending::Call(respond));
                self.send(id, &method, &params).await
            }
            Instruction::Subscribe { method, params, unsubscribe, respond } => {
                let id = self.allocate_id();
                self.pending.insert(id, Pending::Subscribe { unsubscribe, respond });
                self.send(id, &method, &params).await
            }
            Instruction::Unsubscribe { subscription } => self.unsubscribe(&subscription).await,
            Instruction::Shutdown { .. } => Ok(()),
        }
    }

    async fn unsubscribe(&mut self, subscription: &str) -> RpcResult<()> {
        let Some(active) = self.subscriptions.remove(subscription) else {
            return Ok(());
        };
        let id = self.allocate_id();
        self.pending.insert(id, Pending::Unsubscribe);
        tracing::debug!(subscription = subscription, method = %active.unsubscribe, "Unsubscribing");
        self.send(id, &active.unsubscribe, &Value::Array(vec![Value::String(subscription.to_string())]))
            .await
    }

    async fn handle_frame(&mut self, text: &str) {
        let frame: IncomingFrame = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring malformed frame");
                return;
            }
        };

        if let Some(id) = frame.id {
            self.handle_response(id, frame);
            return;
        }

        if let Some(params) = frame.params {
            let key = subscription_key(&params.subscription);
            let delivered = match self.subscriptions.get(&key) {
                Some(active) => active.sink.send(params.result).is_ok(),
                None => {
                    tracing::trace!(subscription = %key, method = ?frame.method, "Notification for unknown subscription");
                    true
                }
            };
            if !delivered {
                // Receiver is gone; tell the node to stop sending.
                if let Err(e) = self.unsubscribe(&key).await {
                    tracing::warn!(error = %e, "Failed to unsubscribe");
                }
            }
        }
    }

    fn handle_response(&mut self, id: u64, frame: IncomingFrame) {
        let Some(pending) = self.pending.remove(&id) else {
            tracing::trace!(id = id, "Response for unknown request");
            return;
        };

        let result = match frame.error {
            Some(error) => Err(RpcError::from(error)),
            None => Ok(frame.result.unwrap_or(Value::Null)),
        };

        match pending {
            Pending::Call(respond) => {
                let _ = respond.send(result);
            }
            Pending::Subscribe { unsubscribe, respond } => {
                let reply = result.map(|id| {
                    let key = subscription_key(&id);
                    let (sink, items) = mpsc::unbounded_channel();
                    self.subscriptions
                        .insert(key.clone(), ActiveSubscription { unsubscribe, sink });
                    (key, items)
                });
                if let Err(Ok((key, _))) = respond.send(reply) {
                    // Caller timed out before the reply arrived.
                    self.subscriptions.remove(&key);
                }
            }
            Pending::Unsubscribe => {
                if let Err(e) = result {
                    tracing::debug!(error = %e, "Unsubscribe rejected");
                }
            }
        }
    }

    async fn shutdown(&mut self) {
        let open: Vec<String> = self.subscriptions.keys().cloned().collect();
        for subscription in open {
            if let Err(e) = self.unsubscribe(&subscription).await {
                tracing::debug!(error = %e, "Unsubscribe during shutdown failed");
                break;
            }
        }
        if let Err(e) = self.socket.close(None).await {
            tracing::debug!(error = %e, "Close frame not delivered");
        }
    }

    fn fail_pending(&mut self) {
        for (_, pending) in self.pending.drain() {
            match pending {
                Pending::Call(respond) => {
                    let _ = respond.send(Err(RpcError::ConnectionClosed));
                }
                Pending::Subscribe { respond, .. } => {
                    let _ = respond.send(Err(RpcError::ConnectionClosed));
                }
                Pending::Unsubscribe => {}
            }
        }
        self.subscriptions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sweep_drops_abandoned_requests() {
        let mut pending = HashMap::new();
        let (waiting, _rx_waiting) = oneshot::channel();
        let (gave_up, rx_gave_up) = oneshot::channel();
        let (sub_gave_up, rx_sub) = oneshot::channel::<SubscribeReply>();
        pending.insert(1, Pending::Call(waiting));
        pending.insert(2, Pending::Call(gave_up));
        pending.insert(
            3,
            Pending::Subscribe {
                unsubscribe: "chain_unsubscribeNewHeads".to_string(),
                respond: sub_gave_up,
            },
        );
        pending.insert(4, Pending::Unsubscribe);
        drop(rx_gave_up);
        drop(rx_sub);

        assert_eq!(sweep_abandoned(&mut pending), 2);
        let mut left: Vec<u64> = pending.keys().copied().collect();
        left.sort_unstable();
        assert_eq!(left, vec![1, 4]);
    }
}
