//! Signer seam for external wallets

use aptlend_core::{AccountAddress, WalletError};
use async_trait::async_trait;

use crate::request::Ed25519Signature;

/// Signs transaction signing-messages on behalf of one account.
///
/// Implemented by wallet plugins; key material never enters this workspace.
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    /// Account the signatures are produced for
    fn address(&self) -> AccountAddress;

    /// Sign the BCS signing message returned by `encode_submission`
    async fn sign(&self, message: &[u8]) -> Result<Ed25519Signature, WalletError>;
}
