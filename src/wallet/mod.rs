//! Wallet access: authorized extensions, their accounts and signers.

pub mod bridge;
pub mod extension;
pub mod types;

pub use bridge::{Signer, WalletBridge};
pub use extension::ExtensionBridge;
pub use types::{
    AccountMeta, InjectedAccount, InjectedExtension, SignerPayload, SignerResult, WalletError,
    WalletResult,
};
