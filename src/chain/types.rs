//! Chain-specific types and error definitions.

use std::fmt;
use std::str::FromStr;

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::chain::ss58;
use crate::rpc::RpcError;

/// Default SS58 prefix (generic Substrate, also used by Aleph Zero).
pub const DEFAULT_SS58_PREFIX: u16 = 42;

/// Native token amount.
pub type Balance = u128;

/// Errors that can occur during chain operations.
#[derive(Debug, Error)]
pub enum ChainError {
    /// Transport or node-side RPC failure.
    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// Address failed SS58 parsing.
    #[error("invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    /// SCALE or hex data could not be decoded.
    #[error("codec error: {0}")]
    Codec(String),

    /// The signer refused or failed to produce an extrinsic.
    #[error("signing failed: {0}")]
    Signing(String),

    /// The node answered with something structurally unexpected.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

/// Result type for chain operations.
pub type ChainResult<T> = Result<T, ChainError>;

impl From<parity_scale_codec::Error> for ChainError {
    fn from(e: parity_scale_codec::Error) -> Self {
        ChainError::Codec(e.to_string())
    }
}

/// 32-byte account identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Encode, Decode)]
pub struct AccountId(pub [u8; 32]);

impl AccountId {
    /// Format under a specific network prefix.
    pub fn to_ss58(&self, prefix: u16) -> String {
        ss58::encode(prefix, &self.0)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl FromStr for AccountId {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(hex_str) = s.strip_prefix("0x") {
            let bytes = hex::decode(hex_str).map_err(|e| ChainError::InvalidAddress {
                address: s.to_string(),
                reason: e.to_string(),
            })?;
            let raw: [u8; 32] = bytes.try_into().map_err(|_| ChainError::InvalidAddress {
                address: s.to_string(),
                reason: "expected 32 bytes".to_string(),
            })?;
            return Ok(Self(raw));
        }
        ss58::decode(s)
            .map(|(_, raw)| Self(raw))
            .map_err(|e| ChainError::InvalidAddress {
                address: s.to_string(),
                reason: e.to_string(),
            })
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_ss58(DEFAULT_SS58_PREFIX))
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self)
    }
}

impl Serialize for AccountId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// 32-byte hash (block hash, extrinsic hash).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Encode, Decode)]
pub struct H256(pub [u8; 32]);

impl fmt::Display for H256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for H256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl FromStr for H256 {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = decode_hex(s)?;
        let raw: [u8; 32] = bytes
            .try_into()
            .map_err(|_| ChainError::Codec(format!("expected 32-byte hash, got '{}'", s)))?;
        Ok(Self(raw))
    }
}

impl Serialize for H256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for H256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Decode a `0x`-prefixed (or bare) hex string.
pub fn decode_hex(s: &str) -> ChainResult<Vec<u8>> {
    hex::decode(s.strip_prefix("0x").unwrap_or(s))
        .map_err(|e| ChainError::Codec(format!("invalid hex '{}': {}", s, e)))
}

/// `blake2b-256` digest, the hash Substrate uses for blocks and extrinsics.
pub fn blake2_256(data: &[u8]) -> H256 {
    let mut hasher = Blake2b::<U32>::new();
    hasher.update(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    H256(out)
}

/// Encode bytes as a `0x`-prefixed hex string.
pub fn encode_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Two-dimensional weight: computation time and proof size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode, Serialize, Deserialize)]
pub struct Weight {
    #[codec(compact)]
    pub ref_time: u64,
    #[codec(compact)]
    pub proof_size: u64,
}

impl Weight {
    pub const fn new(ref_time: u64, proof_size: u64) -> Self {
        Self { ref_time, proof_size }
    }
}

impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ refTime: {}, proofSize: {} }}", self.ref_time, self.proof_size)
    }
}

impl From<crate::config::WeightConfig> for Weight {
    fn from(w: crate::config::WeightConfig) -> Self {
        Self::new(w.ref_time, w.proof_size)
    }
}

/// Gas ceiling for a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GasLimit {
    /// Let the node use the maximum block weight (dry runs only).
    #[default]
    Unlimited,
    Limited(Weight),
}

impl GasLimit {
    pub fn as_option(&self) -> Option<Weight> {
        match self {
            GasLimit::Unlimited => None,
            GasLimit::Limited(weight) => Some(*weight),
        }
    }
}

impl From<Option<Weight>> for GasLimit {
    fn from(weight: Option<Weight>) -> Self {
        weight.map_or(GasLimit::Unlimited, GasLimit::Limited)
    }
}

/// Storage deposit outcome of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StorageDeposit {
    /// Balance returned to the caller.
    Refund(Balance),
    /// Balance reserved from the caller.
    Charge(Balance),
}

impl Default for StorageDeposit {
    fn default() -> Self {
        StorageDeposit::Charge(0)
    }
}

impl fmt::Display for StorageDeposit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageDeposit::Refund(amount) => write!(f, "{{ refund: {} }}", amount),
            StorageDeposit::Charge(amount) => write!(f, "{{ charge: {} }}", amount),
        }
    }
}

/// Extrinsic status as reported by `author_extrinsicUpdate`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TxStatus {
    /// In the pool, waiting on a nonce gap.
    Future,
    /// In the pool, ready for inclusion.
    Ready,
    /// Gossiped to the listed peers.
    Broadcast(Vec<String>),
    /// Included in the given block.
    InBlock(H256),
    /// The including block was retracted.
    Retracted(H256),
    /// Finality could not be reached in time.
    FinalityTimeout(H256),
    /// The including block was finalized.
    Finalized(H256),
    /// Replaced by another extrinsic with the same nonce.
    Usurped(H256),
    /// Removed from the pool for lack of space.
    Dropped,
    /// Rejected as invalid.
    Invalid,
}

impl TxStatus {
    /// Stable lowercase name for logs and metrics.
    pub fn name(&self) -> &'static str {
        match self {
            TxStatus::Future => "future",
            TxStatus::Ready => "ready",
            TxStatus::Broadcast(_) => "broadcast",
            TxStatus::InBlock(_) => "in_block",
            TxStatus::Retracted(_) => "retracted",
            TxStatus::FinalityTimeout(_) => "finality_timeout",
            TxStatus::Finalized(_) => "finalized",
            TxStatus::Usurped(_) => "usurped",
            TxStatus::Dropped => "dropped",
            TxStatus::Invalid => "invalid",
        }
    }

    /// The node sends nothing after this status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TxStatus::Finalized(_)
                | TxStatus::FinalityTimeout(_)
                | TxStatus::Usurped(_)
                | TxStatus::Dropped
                | TxStatus::Invalid
        )
    }

    /// Terminal without finalization.
    pub fn is_failure(&self) -> bool {
        self.is_terminal() && !matches!(self, TxStatus::Finalized(_))
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxStatus::InBlock(h)
            | TxStatus::Retracted(h)
            | TxStatus::FinalityTimeout(h)
            | TxStatus::Finalized(h)
            | TxStatus::Usurped(h) => write!(f, "{}({})", self.name(), h),
            TxStatus::Broadcast(peers) => write!(f, "broadcast({} peers)", peers.len()),
            _ => f.write_str(self.name()),
        }
    }
}

/// Runtime version as returned by `state_getRuntimeVersion`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeVersion {
    pub spec_name: String,
    pub spec_version: u32,
    pub transaction_version: u32,
}

/// The parts of a block header the client uses.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    pub parent_hash: H256,
    #[serde(deserialize_with = "hex_number")]
    pub number: u64,
    pub state_root: H256,
}

fn hex_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let s = String::deserialize(deserializer)?;
    u64::from_str_radix(s.strip_prefix("0x").unwrap_or(&s), 16).map_err(serde::de::Error::custom)
}

/// Snapshot of chain identity and head.
#[derive(Debug, Clone)]
pub struct ChainInfo {
    pub chain: String,
    pub genesis_hash: H256,
    pub runtime: RuntimeVersion,
    pub best_number: u64,
    pub best_hash: H256,
}
