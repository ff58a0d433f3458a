//! Wallet collaborator traits.

use std::sync::Arc;

use async_trait::async_trait;

use crate::wallet::types::{InjectedAccount, InjectedExtension, SignerPayload, SignerResult, WalletResult};

/// Access to the user's wallet extensions.
#[async_trait]
pub trait WalletBridge: Send + Sync {
    /// Ask every available extension to authorize `app_name`.
    async fn enable(&self, app_name: &str) -> WalletResult<Vec<InjectedExtension>>;

    /// Accounts exposed by the enabled extensions.
    async fn accounts(&self) -> WalletResult<Vec<InjectedAccount>>;

    /// A signer bound to the extension that holds `address`.
    async fn signer(&self, address: &str) -> WalletResult<Arc<dyn Signer>>;
}

/// Produces signed extrinsics.
#[async_trait]
pub trait Signer: Send + Sync {
    async fn sign_payload(&self, payload: &SignerPayload) -> WalletResult<SignerResult>;
}
