//! JSON-RPC 2.0 envelopes and transport errors.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur on the node transport.
#[derive(Debug, Error)]
pub enum RpcError {
    /// Socket could not be opened or a frame could not be written.
    #[error("transport error: {0}")]
    Transport(String),

    /// No response within the request deadline.
    #[error("request '{method}' timed out after {secs} seconds")]
    Timeout { method: String, secs: u64 },

    /// The socket closed while the request was in flight.
    #[error("connection closed")]
    ConnectionClosed,

    /// The node answered with a JSON-RPC error object.
    #[error("server error {code}: {message}")]
    Server { code: i64, message: String },

    /// The response did not have the expected shape.
    #[error("decode error: {0}")]
    Decode(String),
}

/// Result type for transport operations.
pub type RpcResult<T> = Result<T, RpcError>;

/// Outgoing request frame.
#[derive(Debug, Serialize)]
pub(crate) struct RequestFrame<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: &'a Value,
}

impl<'a> RequestFrame<'a> {
    pub fn new(id: u64, method: &'a str, params: &'a Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method,
            params,
        }
    }
}

/// Error object carried by a failed response.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

impl From<ErrorObject> for RpcError {
    fn from(e: ErrorObject) -> Self {
        let message = match e.data {
            Some(Value::String(data)) => format!("{}: {}", e.message, data),
            Some(data) => format!("{}: {}", e.message, data),
            None => e.message,
        };
        RpcError::Server { code: e.code, message }
    }
}

/// Payload of a subscription notification.
#[derive(Debug, Deserialize)]
pub(crate) struct NotificationParams {
    pub subscription: Value,
    pub result: Value,
}

/// Any frame the node sends: a response (has `id`) or a notification
/// (has `method` and `params`).
#[derive(Debug, Deserialize)]
pub(crate) struct IncomingFrame {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<ErrorObject>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub params: Option<NotificationParams>,
}

/// Subscription ids are strings on current nodes and numbers on old ones.
pub(crate) fn subscription_key(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
