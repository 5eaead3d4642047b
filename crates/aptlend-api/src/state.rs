//! Application state shared across API handlers

use std::sync::Arc;
use std::time::Duration;

use aptlend_core::{AccountAddress, AppConfig, Error, WalletError};
use aptos_node_client::{NodeClient, ResourceReader};
use backend_client::BackendClient;
use lending::{ContractPoller, LendingActions, TxContext};
use wallet_session::WalletSession;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    node: NodeClient,
    session: WalletSession,
    poller: ContractPoller,
    actions: LendingActions,
    backend: BackendClient,
}

impl AppState {
    /// Wire every service from configuration. Polling starts only once a
    /// wallet connects.
    pub fn new(config: AppConfig) -> Result<Self, Error> {
        let node = NodeClient::new(config.node.clone())?;
        let reader: Arc<dyn ResourceReader> = Arc::new(node.clone());
        let poller = ContractPoller::with_interval(
            reader,
            config.contract.clone(),
            Duration::from_secs(config.poll_interval_secs),
        );
        let backend =
            BackendClient::new(&config.backend).map_err(|e| Error::Config(e.to_string()))?;
        let session = WalletSession::new(config.network);

        Ok(Self::from_parts(config, node, session, poller, backend))
    }

    /// Assemble from pre-built services
    pub fn from_parts(
        config: AppConfig,
        node: NodeClient,
        session: WalletSession,
        poller: ContractPoller,
        backend: BackendClient,
    ) -> Self {
        let actions = LendingActions::new(
            session.clone(),
            node.clone(),
            TxContext::from_config(&config),
            poller.clone(),
        );
        Self {
            inner: Arc::new(AppStateInner {
                config,
                node,
                session,
                poller,
                actions,
                backend,
            }),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn node(&self) -> &NodeClient {
        &self.inner.node
    }

    pub fn session(&self) -> &WalletSession {
        &self.inner.session
    }

    pub fn poller(&self) -> &ContractPoller {
        &self.inner.poller
    }

    pub fn actions(&self) -> &LendingActions {
        &self.inner.actions
    }

    pub fn tx_context(&self) -> &TxContext {
        self.inner.actions.context()
    }

    pub fn backend(&self) -> &BackendClient {
        &self.inner.backend
    }

    /// Connect through the named wallet and start polling for its account
    pub async fn connect_wallet(&self, wallet_name: &str) -> Result<AccountAddress, WalletError> {
        let account = self.inner.session.connect(wallet_name).await?;
        self.inner.poller.set_account(Some(account.to_string()));
        Ok(account)
    }

    /// Disconnect the wallet and stop polling; the last snapshot is kept
    pub async fn disconnect_wallet(&self) -> Result<(), WalletError> {
        self.inner.session.disconnect().await?;
        self.inner.poller.set_account(None);
        Ok(())
    }

    pub fn shutdown(&self) {
        self.inner.poller.shutdown();
    }
}
