//! wallet-session: Wallet connection lifecycle for aptlend
//!
//! One `WalletSession` per application holds the connected account, its
//! network and the registered wallet plugins. Transaction signing is routed
//! to the active plugin through `aptos_tx::TransactionSigner`.

pub mod plugin;
pub mod session;

pub use plugin::{PluginInfo, WalletConnection, WalletPlugin, WatchOnlyWallet};
pub use session::{SessionSnapshot, SessionStatus, WalletSession};
