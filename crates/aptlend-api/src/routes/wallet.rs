//! Wallet session endpoints
//!
//! Connecting points the contract poller at the new account; disconnecting
//! stops it and keeps the last snapshot.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

use wallet_session::{PluginInfo, SessionSnapshot};

use crate::dto::{wallet_failure, ApiResult, ConnectRequest};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/status", get(status))
        .route("/plugins", get(plugins))
        .route("/connect", post(connect))
        .route("/disconnect", post(disconnect))
}

async fn status(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.session().snapshot())
}

async fn plugins(State(state): State<AppState>) -> Json<Vec<PluginInfo>> {
    Json(state.session().plugins())
}

async fn connect(
    State(state): State<AppState>,
    Json(request): Json<ConnectRequest>,
) -> ApiResult<SessionSnapshot> {
    state
        .connect_wallet(&request.wallet)
        .await
        .map_err(wallet_failure)?;
    tracing::info!(wallet = %request.wallet, "Wallet connected");
    Ok(Json(state.session().snapshot()))
}

async fn disconnect(State(state): State<AppState>) -> ApiResult<SessionSnapshot> {
    state.disconnect_wallet().await.map_err(wallet_failure)?;
    tracing::info!("Wallet disconnected");
    Ok(Json(state.session().snapshot()))
}
