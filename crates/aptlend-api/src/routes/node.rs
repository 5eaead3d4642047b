//! Fullnode status endpoint

use axum::{extract::State, routing::get, Json, Router};

use crate::dto::NodeStatusResponse;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/status", get(get_status))
}

/// GET /node/status - Ledger info of the configured fullnode
pub async fn get_status(State(state): State<AppState>) -> Json<NodeStatusResponse> {
    let config = state.config();
    let mut response = NodeStatusResponse {
        connected: false,
        url: config.node.url.clone(),
        network: config.network.as_str().to_string(),
        chain_id: None,
        ledger_version: None,
        block_height: None,
        faucet_url: config.node.faucet_url.clone(),
    };

    match state.node().ledger_info().await {
        Ok(info) => {
            response.connected = true;
            response.chain_id = Some(info.chain_id);
            response.ledger_version = Some(info.ledger_version);
            response.block_height = Some(info.block_height);
        }
        Err(e) => {
            tracing::warn!(url = %config.node.url, error = %e, "Node status check failed");
        }
    }

    Json(response)
}
