//! API route handlers

pub mod contract;
pub mod dashboard;
pub mod health;
pub mod node;
pub mod users;
pub mod wallet;

use axum::{routing::get, Router};

use crate::AppState;

/// Create the API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .nest("/node", node::router())
        .nest("/contract", contract::router())
        .nest("/dashboard", dashboard::router())
        .nest("/wallet", wallet::router())
        .nest("/users", users::router())
        .with_state(state)
}
