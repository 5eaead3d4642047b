use std::sync::Arc;

use anyhow::Context;
use aptlend_api::{start_server, AppState};
use aptlend_core::{AccountAddress, AppConfig};
use wallet_session::WatchOnlyWallet;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("aptlend=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .init();

    let config = AppConfig::from_env().context("Invalid APTLEND_* configuration")?;
    tracing::info!(
        network = %config.network,
        node = %config.node.url,
        contract = %config.contract.address,
        "Starting aptlend"
    );

    let state = AppState::new(config.clone()).context("Failed to initialize services")?;

    // Signing goes through an external wallet using the build endpoints
    if let Some(account) = &config.account {
        let address = AccountAddress::parse(account)?;
        state
            .session()
            .register(Arc::new(WatchOnlyWallet::new(address, config.network)));
        tracing::info!(account = %account, "Watch-only wallet registered");
    }

    start_server(state, config.api_port).await?;
    Ok(())
}
