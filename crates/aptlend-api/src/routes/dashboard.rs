//! Lender and borrower dashboards over the current snapshot

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use lending::{BorrowerDashboard, LenderDashboard};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/lender/:address", get(lender_dashboard))
        .route("/borrower/:address", get(borrower_dashboard))
}

async fn lender_dashboard(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Json<LenderDashboard> {
    Json(LenderDashboard::build(&state.poller().state(), &address))
}

async fn borrower_dashboard(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Json<BorrowerDashboard> {
    Json(BorrowerDashboard::build(&state.poller().state(), &address))
}
