//! Browser-extension page protocol over WebSocket.
//!
//! # Responsibilities
//! - Reach each configured extension endpoint
//! - Request authorization for the application (`pub(authorize.tab)`)
//! - List accounts (`pub(accounts.list)`), tagging each with its extension
//! - Sign payloads (`pub(extrinsic.sign)`) with the extension holding the key
//!
//! # Data Flow
//! ```text
//! {id, message, origin: "page", request} → extension
//! extension → {id, response} | {id, error}
//! ```
//!
//! # Design Decisions
//! - One connection per extension; requests on it are serialized
//! - An extension that is unreachable or declines is skipped with a warning

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::config::{ExtensionEndpoint, WalletConfig};
use crate::resilience::deadline;
use crate::wallet::bridge::{Signer, WalletBridge};
use crate::wallet::types::{
    AccountMeta, InjectedAccount, InjectedExtension, SignerPayload, SignerResult, WalletError,
    WalletResult,
};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const MESSAGE_AUTHORIZE: &str = "pub(authorize.tab)";
const MESSAGE_ACCOUNTS: &str = "pub(accounts.list)";
const MESSAGE_SIGN: &str = "pub(extrinsic.sign)";

#[derive(Debug, Deserialize)]
struct Reply {
    id: u64,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    response: Option<Value>,
}

/// Account as listed by the extension itself.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListedAccount {
    address: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    genesis_hash: Option<String>,
    #[serde(default, rename = "type")]
    key_type: Option<String>,
}

/// Session with one extension.
struct ExtensionConnection {
    name: String,
    endpoint: String,
    socket: Mutex<Socket>,
    next_id: AtomicU64,
    request_timeout: Duration,
}

impl ExtensionConnection {
    async fn open(extension: &ExtensionEndpoint, request_timeout: Duration) -> WalletResult<Self> {
        let (socket, _response) = deadline(request_timeout, tokio_tungstenite::connect_async(extension.endpoint.as_str()))
            .await
            .map_err(|_| WalletError::Timeout("connect".to_string()))?
            .map_err(|e| WalletError::Transport(format!("{}: {}", extension.endpoint, e)))?;

        Ok(Self {
            name: extension.name.clone(),
            endpoint: extension.endpoint.clone(),
            socket: Mutex::new(socket),
            next_id: AtomicU64::new(1),
            request_timeout,
        })
    }

    async fn send<T: DeserializeOwned>(&self, message: &str, request: Value) -> WalletResult<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let frame = json!({ "id": id, "message": message, "origin": "page", "request": request });

        let mut socket = self.socket.lock().await;
        socket
            .send(Message::Text(frame.to_string().into()))
            .await
            .map_err(|e| WalletError::Transport(e.to_string()))?;

        let reply = deadline(self.request_timeout, read_reply(&mut socket, id))
            .await
            .map_err(|_| WalletError::Timeout(message.to_string()))??;
        drop(socket);

        if let Some(error) = reply.error {
            return Err(WalletError::Rejected(error));
        }
        serde_json::from_value(reply.response.unwrap_or(Value::Null))
            .map_err(|e| WalletError::Protocol(format!("{} response: {}", message, e)))
    }

    async fn close(&self) {
        let mut socket = self.socket.lock().await;
        if let Err(e) = socket.close(None).await {
            tracing::debug!(extension = %self.name, error = %e, "Extension socket close failed");
        }
    }
}

async fn read_reply(socket: &mut Socket, id: u64) -> WalletResult<Reply> {
    loop {
        let text = match socket.next().await {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Close(_))) | None => {
                return Err(WalletError::Transport("extension closed the connection".to_string()))
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(WalletError::Transport(e.to_string())),
        };

        let reply: Reply = serde_json::from_str(text.as_str())
            .map_err(|e| WalletError::Protocol(format!("malformed reply: {}", e)))?;
        if reply.id == id {
            return Ok(reply);
        }
        tracing::trace!(id = reply.id, "Skipping reply for another request");
    }
}

#[derive(Default)]
struct BridgeState {
    enabled: Vec<Arc<ExtensionConnection>>,
    owners: HashMap<String, Arc<ExtensionConnection>>,
}

/// [`WalletBridge`] over the extension page protocol.
pub struct ExtensionBridge {
    extensions: Vec<ExtensionEndpoint>,
    request_timeout: Duration,
    state: Mutex<BridgeState>,
}

impl ExtensionBridge {
    pub fn new(config: &WalletConfig) -> Self {
        Self {
            extensions: config.extensions.clone(),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            state: Mutex::new(BridgeState::default()),
        }
    }

    /// Close every extension connection.
    pub async fn close(&self) {
        let mut state = self.state.lock().await;
        for connection in state.enabled.drain(..) {
            connection.close().await;
        }
        state.owners.clear();
    }
}

#[async_trait]
impl WalletBridge for ExtensionBridge {
    async fn enable(&self, app_name: &str) -> WalletResult<Vec<InjectedExtension>> {
        let mut enabled = Vec::new();

        for extension in &self.extensions {
            let connection = match ExtensionConnection::open(extension, self.request_timeout).await {
                Ok(connection) => connection,
                Err(e) => {
                    tracing::warn!(extension = %extension.name, error = %e, "Extension unavailable");
                    continue;
                }
            };

            match connection.send::<bool>(MESSAGE_AUTHORIZE, json!({ "origin": app_name })).await {
                Ok(true) => {
                    tracing::debug!(extension = %extension.name, "Extension authorized");
                    enabled.push(Arc::new(connection));
                }
                Ok(false) => {
                    tracing::warn!(extension = %extension.name, "Extension declined authorization");
                    connection.close().await;
                }
                Err(e) => {
                    tracing::warn!(extension = %extension.name, error = %e, "Authorization failed");
                    connection.close().await;
                }
            }
        }

        let injected = enabled
            .iter()
            .map(|c| InjectedExtension {
                name: c.name.clone(),
                endpoint: c.endpoint.clone(),
            })
            .collect();

        let mut state = self.state.lock().await;
        state.enabled = enabled;
        state.owners.clear();
        Ok(injected)
    }

    async fn accounts(&self) -> WalletResult<Vec<InjectedAccount>> {
        let mut state = self.state.lock().await;
        if state.enabled.is_empty() {
            return Err(WalletError::NotEnabled);
        }

        let mut accounts = Vec::new();
        let mut owners = HashMap::new();
        for connection in &state.enabled {
            let listed: Vec<ListedAccount> = match connection.send(MESSAGE_ACCOUNTS, json!({})).await {
                Ok(listed) => listed,
                Err(e) => {
                    tracing::warn!(extension = %connection.name, error = %e, "Account listing failed");
                    continue;
                }
            };

            for account in listed {
                owners
                    .entry(account.address.clone())
                    .or_insert_with(|| Arc::clone(connection));
                accounts.push(InjectedAccount {
                    address: account.address,
                    meta: AccountMeta {
                        name: account.name,
                        source: connection.name.clone(),
                        genesis_hash: account.genesis_hash,
                    },
                    key_type: account.key_type,
                });
            }
        }

        state.owners = owners;
        Ok(accounts)
    }

    async fn signer(&self, address: &str) -> WalletResult<Arc<dyn Signer>> {
        let state = self.state.lock().await;
        let connection = state
            .owners
            .get(address)
            .cloned()
            .ok_or_else(|| WalletError::UnknownAccount(address.to_string()))?;
        Ok(Arc::new(ExtensionSigner { connection }))
    }
}

impl std::fmt::Debug for ExtensionBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionBridge")
            .field("extensions", &self.extensions.len())
            .finish()
    }
}

/// Signs with the extension holding the account.
struct ExtensionSigner {
    connection: Arc<ExtensionConnection>,
}

#[async_trait]
impl Signer for ExtensionSigner {
    async fn sign_payload(&self, payload: &SignerPayload) -> WalletResult<SignerResult> {
        let request = serde_json::to_value(payload)
            .map_err(|e| WalletError::Protocol(format!("cannot serialize payload: {}", e)))?;
        tracing::info!(extension = %self.connection.name, address = %payload.address, "Requesting signature");
        self.connection.send(MESSAGE_SIGN, request).await
    }
}
