//! Wallet session state machine

use std::sync::{Arc, Mutex, MutexGuard};

use aptlend_core::{AccountAddress, Network, WalletError};
use aptos_tx::{Ed25519Signature, TransactionSigner};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::plugin::{PluginInfo, WalletPlugin};

/// Connection lifecycle.
///
/// `Disconnected → Connecting → Connected → Disconnecting → Disconnected`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnecting => "disconnecting",
        }
    }

    pub fn is_transitional(&self) -> bool {
        matches!(self, Self::Connecting | Self::Disconnecting)
    }
}

/// Read-only view of the session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub wallet: Option<String>,
    pub account: Option<AccountAddress>,
    pub public_key: Option<String>,
    pub network: Option<Network>,
    pub connected_at: Option<DateTime<Utc>>,
}

struct SessionState {
    status: SessionStatus,
    plugins: Vec<Arc<dyn WalletPlugin>>,
    active: Option<Arc<dyn WalletPlugin>>,
    account: Option<AccountAddress>,
    public_key: Option<String>,
    network: Option<Network>,
    connected_at: Option<DateTime<Utc>>,
}

/// The application's single wallet session.
///
/// Cloning shares the session; create it once at the application root.
#[derive(Clone)]
pub struct WalletSession {
    inner: Arc<Mutex<SessionState>>,
    default_network: Network,
}

impl WalletSession {
    pub fn new(default_network: Network) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionState {
                status: SessionStatus::Disconnected,
                plugins: Vec::new(),
                active: None,
                account: None,
                public_key: None,
                network: None,
                connected_at: None,
            })),
            default_network,
        }
    }

    /// Register a wallet plugin; a plugin with the same name is replaced
    pub fn register(&self, plugin: Arc<dyn WalletPlugin>) {
        let mut state = self.lock();
        state.plugins.retain(|p| p.name() != plugin.name());
        tracing::debug!(wallet = %plugin.name(), "Registered wallet plugin");
        state.plugins.push(plugin);
    }

    pub fn plugins(&self) -> Vec<PluginInfo> {
        self.lock().plugins.iter().map(|p| p.info()).collect()
    }

    pub fn status(&self) -> SessionStatus {
        self.lock().status
    }

    pub fn account(&self) -> Option<AccountAddress> {
        let state = self.lock();
        match state.status {
            SessionStatus::Connected => state.account.clone(),
            _ => None,
        }
    }

    pub fn network(&self) -> Option<Network> {
        self.lock().network
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.lock();
        SessionSnapshot {
            status: state.status,
            wallet: state.active.as_ref().map(|p| p.name().to_string()),
            account: state.account.clone(),
            public_key: state.public_key.clone(),
            network: state.network,
            connected_at: state.connected_at,
        }
    }

    /// Connected account, or `NotConnected` before any network call is made
    pub fn ensure_connected(&self) -> Result<AccountAddress, WalletError> {
        let state = self.lock();
        match (&state.status, &state.account) {
            (SessionStatus::Connected, Some(account)) => Ok(account.clone()),
            _ => Err(WalletError::NotConnected),
        }
    }

    /// Connect through the named plugin.
    ///
    /// Only accepted while disconnected. On failure the session returns to
    /// `Disconnected` and the wallet's error is returned.
    pub async fn connect(&self, wallet_name: &str) -> Result<AccountAddress, WalletError> {
        let plugin = {
            let mut state = self.lock();
            match state.status {
                SessionStatus::Disconnected => {}
                SessionStatus::Connected => return Err(WalletError::AlreadyConnected),
                transitional => {
                    return Err(WalletError::Busy {
                        state: transitional.as_str().to_string(),
                    })
                }
            }
            let plugin = state
                .plugins
                .iter()
                .find(|p| p.name() == wallet_name)
                .cloned()
                .ok_or_else(|| WalletError::PluginNotFound {
                    name: wallet_name.to_string(),
                })?;
            state.status = SessionStatus::Connecting;
            plugin
        };

        tracing::info!(wallet = %wallet_name, "Connecting wallet");
        let mut guard = Transition::new(self, SessionStatus::Disconnected);

        match plugin.connect().await {
            Ok(connection) => {
                guard.complete();
                let mut state = self.lock();
                state.status = SessionStatus::Connected;
                state.account = Some(connection.address.clone());
                state.public_key = connection.public_key;
                state.network = Some(connection.network.unwrap_or(self.default_network));
                state.connected_at = Some(Utc::now());
                state.active = Some(plugin);
                tracing::info!(wallet = %wallet_name, account = %connection.address, "Wallet connected");
                Ok(connection.address)
            }
            Err(e) => {
                tracing::warn!(wallet = %wallet_name, error = %e, "Wallet connect failed");
                Err(e)
            }
        }
    }

    /// Disconnect the active wallet.
    ///
    /// Only accepted while connected. On failure the session stays
    /// `Connected` and the wallet's error is returned.
    pub async fn disconnect(&self) -> Result<(), WalletError> {
        let plugin = {
            let mut state = self.lock();
            match state.status {
                SessionStatus::Connected => {}
                SessionStatus::Disconnected => return Err(WalletError::NotConnected),
                transitional => {
                    return Err(WalletError::Busy {
                        state: transitional.as_str().to_string(),
                    })
                }
            }
            let Some(plugin) = state.active.clone() else {
                state.status = SessionStatus::Disconnected;
                return Ok(());
            };
            state.status = SessionStatus::Disconnecting;
            plugin
        };

        let mut guard = Transition::new(self, SessionStatus::Connected);

        match plugin.disconnect().await {
            Ok(()) => {
                guard.complete();
                let mut state = self.lock();
                state.status = SessionStatus::Disconnected;
                state.active = None;
                state.account = None;
                state.public_key = None;
                state.network = None;
                state.connected_at = None;
                tracing::info!(wallet = %plugin.name(), "Wallet disconnected");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(wallet = %plugin.name(), error = %e, "Wallet disconnect failed");
                Err(e)
            }
        }
    }

    /// Signer bound to the active account and wallet
    pub fn signer(&self) -> Result<Arc<dyn TransactionSigner>, WalletError> {
        let state = self.lock();
        match (&state.status, &state.account, &state.active) {
            (SessionStatus::Connected, Some(account), Some(plugin)) => {
                if !plugin.can_sign() {
                    return Err(WalletError::SigningUnsupported {
                        plugin: plugin.name().to_string(),
                    });
                }
                Ok(Arc::new(ActiveSigner {
                    plugin: plugin.clone(),
                    address: account.clone(),
                }))
            }
            _ => Err(WalletError::NotConnected),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        // State stays consistent across a panic in another holder; recover it
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Restores the pre-transition status if the transition does not complete,
/// including when the awaiting future is dropped mid-flight.
struct Transition<'a> {
    session: &'a WalletSession,
    fallback: SessionStatus,
    done: bool,
}

impl<'a> Transition<'a> {
    fn new(session: &'a WalletSession, fallback: SessionStatus) -> Self {
        Self {
            session,
            fallback,
            done: false,
        }
    }

    fn complete(&mut self) {
        self.done = true;
    }
}

impl Drop for Transition<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.session.lock().status = self.fallback;
        }
    }
}

/// `TransactionSigner` routing to the session's active wallet
struct ActiveSigner {
    plugin: Arc<dyn WalletPlugin>,
    address: AccountAddress,
}

#[async_trait]
impl TransactionSigner for ActiveSigner {
    fn address(&self) -> AccountAddress {
        self.address.clone()
    }

    async fn sign(&self, message: &[u8]) -> Result<Ed25519Signature, WalletError> {
        self.plugin.sign(&self.address, message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::{WalletConnection, WatchOnlyWallet};
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::Notify;

    /// Wallet whose connect/disconnect can be made to fail or to block
    struct FakeWallet {
        fail_connect: AtomicBool,
        fail_disconnect: AtomicBool,
        gate: Option<Arc<Notify>>,
    }

    impl FakeWallet {
        fn new() -> Self {
            Self {
                fail_connect: AtomicBool::new(false),
                fail_disconnect: AtomicBool::new(false),
                gate: None,
            }
        }

        fn gated(gate: Arc<Notify>) -> Self {
            Self {
                gate: Some(gate),
                ..Self::new()
            }
        }
    }

    #[async_trait]
    impl WalletPlugin for FakeWallet {
        fn name(&self) -> &str {
            "Petra"
        }

        async fn connect(&self) -> Result<WalletConnection, WalletError> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if self.fail_connect.load(Ordering::SeqCst) {
                return Err(WalletError::ConnectFailed {
                    message: "User rejected the request".to_string(),
                });
            }
            Ok(WalletConnection {
                address: AccountAddress::parse("0x0456").unwrap(),
                public_key: Some("0xabcd".to_string()),
                network: None,
            })
        }

        async fn disconnect(&self) -> Result<(), WalletError> {
            if self.fail_disconnect.load(Ordering::SeqCst) {
                return Err(WalletError::DisconnectFailed {
                    message: "extension not responding".to_string(),
                });
            }
            Ok(())
        }

        async fn sign(
            &self,
            _address: &AccountAddress,
            message: &[u8],
        ) -> Result<Ed25519Signature, WalletError> {
            Ok(Ed25519Signature::from_bytes(&[0xab, 0xcd], message))
        }
    }

    fn session_with(wallet: FakeWallet) -> (WalletSession, Arc<FakeWallet>) {
        let session = WalletSession::new(Network::Testnet);
        let wallet = Arc::new(wallet);
        session.register(wallet.clone());
        (session, wallet)
    }

    #[tokio::test]
    async fn test_connect_and_disconnect() {
        let (session, _) = session_with(FakeWallet::new());
        assert_eq!(session.status(), SessionStatus::Disconnected);
        assert_eq!(session.ensure_connected(), Err(WalletError::NotConnected));

        let account = session.connect("Petra").await.unwrap();
        assert_eq!(account.as_str(), "0x456");
        assert_eq!(session.status(), SessionStatus::Connected);
        assert_eq!(session.network(), Some(Network::Testnet));
        assert_eq!(session.ensure_connected().unwrap(), account);

        let snapshot = session.snapshot();
        assert_eq!(snapshot.wallet.as_deref(), Some("Petra"));
        assert!(snapshot.connected_at.is_some());

        session.disconnect().await.unwrap();
        assert_eq!(session.status(), SessionStatus::Disconnected);
        assert!(session.account().is_none());
    }

    #[tokio::test]
    async fn test_connect_failure_returns_to_disconnected() {
        let (session, wallet) = session_with(FakeWallet::new());
        wallet.fail_connect.store(true, Ordering::SeqCst);

        let err = session.connect("Petra").await.unwrap_err();
        assert!(matches!(err, WalletError::ConnectFailed { .. }));
        assert_eq!(session.status(), SessionStatus::Disconnected);
    }

    #[tokio::test]
    async fn test_disconnect_failure_stays_connected() {
        let (session, wallet) = session_with(FakeWallet::new());
        session.connect("Petra").await.unwrap();
        wallet.fail_disconnect.store(true, Ordering::SeqCst);

        let err = session.disconnect().await.unwrap_err();
        assert!(matches!(err, WalletError::DisconnectFailed { .. }));
        assert_eq!(session.status(), SessionStatus::Connected);
        assert!(session.account().is_some());
    }

    #[tokio::test]
    async fn test_calls_during_transition_are_rejected() {
        let gate = Arc::new(Notify::new());
        let (session, _) = session_with(FakeWallet::gated(gate.clone()));

        let pending = {
            let session = session.clone();
            tokio::spawn(async move { session.connect("Petra").await })
        };
        while session.status() != SessionStatus::Connecting {
            tokio::task::yield_now().await;
        }

        assert_eq!(
            session.connect("Petra").await,
            Err(WalletError::Busy {
                state: "connecting".to_string()
            })
        );
        assert!(matches!(
            session.disconnect().await,
            Err(WalletError::Busy { .. })
        ));
        assert_eq!(session.ensure_connected(), Err(WalletError::NotConnected));

        gate.notify_one();
        pending.await.unwrap().unwrap();
        assert_eq!(session.status(), SessionStatus::Connected);
    }

    #[tokio::test]
    async fn test_double_connect_and_unknown_plugin() {
        let (session, _) = session_with(FakeWallet::new());
        assert_eq!(
            session.connect("Martian").await,
            Err(WalletError::PluginNotFound {
                name: "Martian".to_string()
            })
        );
        assert_eq!(session.status(), SessionStatus::Disconnected);

        session.connect("Petra").await.unwrap();
        assert_eq!(
            session.connect("Petra").await,
            Err(WalletError::AlreadyConnected)
        );
    }

    #[tokio::test]
    async fn test_dropped_connect_restores_status() {
        let gate = Arc::new(Notify::new());
        let (session, _) = session_with(FakeWallet::gated(gate));

        let handle = {
            let session = session.clone();
            tokio::spawn(async move { session.connect("Petra").await })
        };
        while session.status() != SessionStatus::Connecting {
            tokio::task::yield_now().await;
        }
        handle.abort();
        let _ = handle.await;

        assert_eq!(session.status(), SessionStatus::Disconnected);
    }

    #[tokio::test]
    async fn test_signer_routes_to_active_wallet() {
        let (session, _) = session_with(FakeWallet::new());
        assert!(matches!(session.signer(), Err(WalletError::NotConnected)));

        session.connect("Petra").await.unwrap();
        let signer = session.signer().unwrap();
        assert_eq!(signer.address().as_str(), "0x456");
        let sig = signer.sign(&[0x01, 0x02]).await.unwrap();
        assert_eq!(sig.public_key, "0xabcd");
        assert_eq!(sig.signature, "0x0102");
    }

    #[tokio::test]
    async fn test_watch_only_wallet_cannot_sign() {
        let session = WalletSession::new(Network::Testnet);
        session.register(Arc::new(WatchOnlyWallet::new(
            AccountAddress::parse("0x9").unwrap(),
            Network::Devnet,
        )));

        assert_eq!(
            session.plugins(),
            vec![PluginInfo {
                name: "Watch-only".to_string(),
                can_sign: false
            }]
        );

        session.connect(WatchOnlyWallet::NAME).await.unwrap();
        assert_eq!(session.network(), Some(Network::Devnet));
        assert!(matches!(
            session.signer(),
            Err(WalletError::SigningUnsupported { .. })
        ));
    }
}
