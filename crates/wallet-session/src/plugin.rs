//! Wallet plugins: the seam to external wallets

use aptlend_core::{AccountAddress, Network, WalletError};
use aptos_tx::Ed25519Signature;
use async_trait::async_trait;
use serde::Serialize;

/// What a wallet hands back on a successful connect
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletConnection {
    pub address: AccountAddress,
    /// Hex-encoded Ed25519 public key, when the wallet discloses it
    pub public_key: Option<String>,
    /// Network the wallet is pointed at, when it reports one
    pub network: Option<Network>,
}

/// Registered wallet as listed to the UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginInfo {
    pub name: String,
    pub can_sign: bool,
}

/// External wallet adapter.
///
/// Key management and user approval live entirely inside the wallet; the
/// session only asks it to connect, disconnect and sign.
#[async_trait]
pub trait WalletPlugin: Send + Sync {
    fn name(&self) -> &str;

    /// Whether `sign` can ever succeed
    fn can_sign(&self) -> bool {
        true
    }

    async fn connect(&self) -> Result<WalletConnection, WalletError>;

    async fn disconnect(&self) -> Result<(), WalletError>;

    async fn sign(
        &self,
        address: &AccountAddress,
        message: &[u8],
    ) -> Result<Ed25519Signature, WalletError>;

    fn info(&self) -> PluginInfo {
        PluginInfo {
            name: self.name().to_string(),
            can_sign: self.can_sign(),
        }
    }
}

/// Wallet that exposes a fixed address and cannot sign.
///
/// Used by the headless binary: reads and payload building work, signing is
/// left to whichever wallet consumes the built payloads.
pub struct WatchOnlyWallet {
    name: String,
    address: AccountAddress,
    network: Network,
}

impl WatchOnlyWallet {
    pub const NAME: &'static str = "Watch-only";

    pub fn new(address: AccountAddress, network: Network) -> Self {
        Self {
            name: Self::NAME.to_string(),
            address,
            network,
        }
    }
}

#[async_trait]
impl WalletPlugin for WatchOnlyWallet {
    fn name(&self) -> &str {
        &self.name
    }

    fn can_sign(&self) -> bool {
        false
    }

    async fn connect(&self) -> Result<WalletConnection, WalletError> {
        Ok(WalletConnection {
            address: self.address.clone(),
            public_key: None,
            network: Some(self.network),
        })
    }

    async fn disconnect(&self) -> Result<(), WalletError> {
        Ok(())
    }

    async fn sign(
        &self,
        _address: &AccountAddress,
        _message: &[u8],
    ) -> Result<Ed25519Signature, WalletError> {
        Err(WalletError::SigningUnsupported {
            plugin: self.name.clone(),
        })
    }
}
