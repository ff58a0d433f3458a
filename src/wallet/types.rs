//! Wallet-side types and error definitions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while talking to wallet extensions.
#[derive(Debug, Error)]
pub enum WalletError {
    /// The extension could not be reached.
    #[error("wallet transport error: {0}")]
    Transport(String),

    /// The user or the extension declined the request.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// No enabled extension holds this address.
    #[error("no enabled extension holds account {0}")]
    UnknownAccount(String),

    /// The extension answered with something unexpected.
    #[error("wallet protocol error: {0}")]
    Protocol(String),

    /// `accounts` or `signer` called before `enable`.
    #[error("wallet access not enabled")]
    NotEnabled,

    /// The extension did not answer in time.
    #[error("wallet request '{0}' timed out")]
    Timeout(String),
}

/// Result type for wallet operations.
pub type WalletResult<T> = Result<T, WalletError>;

/// An extension that authorized this application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectedExtension {
    pub name: String,
    /// Where the extension was reached.
    pub endpoint: String,
}

/// Descriptive data attached to an account by its extension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountMeta {
    #[serde(default)]
    pub name: Option<String>,
    /// Name of the extension holding the key.
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub genesis_hash: Option<String>,
}

/// An account exposed by an extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectedAccount {
    pub address: String,
    #[serde(default)]
    pub meta: AccountMeta,
    #[serde(default, rename = "type")]
    pub key_type: Option<String>,
}

/// Transaction fields handed to the signer, in the extension's JSON layout.
///
/// Numeric fields are `0x`-prefixed hex as the extension expects them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignerPayload {
    pub address: String,
    pub block_hash: String,
    pub block_number: String,
    pub era: String,
    pub genesis_hash: String,
    /// Encoded call data.
    pub method: String,
    pub nonce: String,
    pub signed_extensions: Vec<String>,
    pub spec_version: String,
    pub tip: String,
    pub transaction_version: String,
    pub version: u8,
    pub with_signed_transaction: bool,
}

/// What the signer returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignerResult {
    pub id: u64,
    pub signature: String,
    /// Complete signed extrinsic, present when requested.
    #[serde(default)]
    pub signed_transaction: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_account_from_extension_json() {
        let account: InjectedAccount = serde_json::from_value(json!({
            "address": "5F8Re8dN4B8eDZqJDmPeLkYaQ14KjK3Bt8qZxQmg5PzYg6Qg",
            "type": "sr25519",
            "meta": {"name": "dev", "source": "polkadot-js"}
        }))
        .unwrap();
        assert_eq!(account.meta.source, "polkadot-js");
        assert_eq!(account.key_type.as_deref(), Some("sr25519"));
    }

    #[test]
    fn test_payload_uses_camel_case() {
        let payload = SignerPayload {
            address: "5F8R".to_string(),
            block_hash: "0x00".to_string(),
            block_number: "0x00000000".to_string(),
            era: "0x00".to_string(),
            genesis_hash: "0x00".to_string(),
            method: "0x1206".to_string(),
            nonce: "0x00000000".to_string(),
            signed_extensions: vec!["CheckNonce".to_string()],
            spec_version: "0x00000044".to_string(),
            tip: "0x00000000000000000000000000000000".to_string(),
            transaction_version: "0x00000011".to_string(),
            version: 4,
            with_signed_transaction: true,
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["withSignedTransaction"], json!(true));
        assert_eq!(value["signedExtensions"], json!(["CheckNonce"]));
        assert_eq!(value["blockHash"], json!("0x00"));
    }
}
