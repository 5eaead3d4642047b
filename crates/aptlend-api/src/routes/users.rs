//! Backend user profile passthrough

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use backend_client::{ApiResponse, CreditScore, UserProfile};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:address", get(profile))
        .route("/:address/credit-score", get(credit_score))
}

async fn profile(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Json<ApiResponse<UserProfile>> {
    Json(state.backend().get_profile(&address).await)
}

async fn credit_score(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Json<ApiResponse<CreditScore>> {
    Json(state.backend().credit_score(&address).await)
}
