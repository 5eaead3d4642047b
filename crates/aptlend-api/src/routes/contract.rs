//! Lending contract routes
//!
//! - GET /contract/state - Full poller snapshot
//! - GET /contract/offers?lender= - Offers, optionally by lender
//! - GET /contract/loans?borrower=&offer_id= - Loan requests
//! - GET /contract/my-loans?address= - Requests borrowed by an address
//! - GET /contract/active-loans/{address} - Approved loans read from the request table
//! - POST /contract/refresh - Run a fetch cycle now
//! - POST /contract/build/{action} - Unsigned payload for an external wallet
//! - POST /contract/actions/{action} - Sign and submit through the connected wallet

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use aptlend_core::ContractError;
use aptos_node_client::SubmitOutcome;
use aptos_tx::TransactionPayload;
use lending::fetch;
use lending::tx_builder;
use lending::{ContractState, CreateOfferForm, LoanOffer, LoanRequest};

use crate::dto::{
    contract_failure, failure, ApiError, ApiFailure, ApiResult, IdRequest, LoansQuery,
    MyLoansQuery, OffersQuery, RequestLoanAction,
};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/state", get(get_state))
        .route("/offers", get(get_offers))
        .route("/loans", get(get_loans))
        .route("/my-loans", get(get_my_loans))
        .route("/active-loans/:address", get(get_active_loans))
        .route("/refresh", post(refresh))
        .route("/build/create-offer", post(build_create_offer))
        .route("/build/cancel-offer", post(build_cancel_offer))
        .route("/build/request-loan", post(build_request_loan))
        .route("/build/approve-loan", post(build_approve_loan))
        .route("/build/reject-loan", post(build_reject_loan))
        .route("/build/repay-loan", post(build_repay_loan))
        .route("/actions/create-offer", post(create_offer))
        .route("/actions/cancel-offer", post(cancel_offer))
        .route("/actions/request-loan", post(request_loan))
        .route("/actions/approve-loan", post(approve_loan))
        .route("/actions/reject-loan", post(reject_loan))
        .route("/actions/repay-loan", post(repay_loan))
}

// =============================================================================
// Reads
// =============================================================================

async fn get_state(State(state): State<AppState>) -> Json<ContractState> {
    Json(state.poller().state())
}

async fn get_offers(
    State(state): State<AppState>,
    Query(query): Query<OffersQuery>,
) -> Json<Vec<LoanOffer>> {
    Json(state.poller().get_loan_offers(query.lender.as_deref()))
}

async fn get_loans(
    State(state): State<AppState>,
    Query(query): Query<LoansQuery>,
) -> Json<Vec<LoanRequest>> {
    Json(
        state
            .poller()
            .get_loan_requests(query.borrower.as_deref(), query.offer_id.as_deref()),
    )
}

async fn get_my_loans(
    State(state): State<AppState>,
    Query(query): Query<MyLoansQuery>,
) -> Json<Vec<LoanRequest>> {
    Json(state.poller().get_my_loans(query.address.as_deref()))
}

async fn get_active_loans(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> ApiResult<Vec<LoanRequest>> {
    fetch::fetch_active_loans(state.node(), &state.config().contract, &address)
        .await
        .map(Json)
        .map_err(|e| {
            tracing::warn!(address = %address, error = %e, "Failed to read loan request table");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiError::new(
                    "fetch_failed",
                    "Failed to fetch your loans. Is the module deployed and initialized?",
                )),
            )
        })
}

async fn refresh(State(state): State<AppState>) -> Json<ContractState> {
    Json(state.poller().refresh().await)
}

// =============================================================================
// Payload builders
// =============================================================================

fn find_offer(state: &AppState, offer_id: &str) -> Result<LoanOffer, ApiFailure> {
    state
        .poller()
        .get_loan_offers(None)
        .into_iter()
        .find(|o| o.offer_id == offer_id)
        .ok_or_else(|| {
            contract_failure(ContractError::OfferNotFound {
                offer_id: offer_id.to_string(),
            })
        })
}

fn payload(
    result: Result<aptos_tx::EntryFunctionPayload, ContractError>,
) -> ApiResult<TransactionPayload> {
    result.map(|p| Json(p.into())).map_err(contract_failure)
}

async fn build_create_offer(
    State(state): State<AppState>,
    Json(form): Json<CreateOfferForm>,
) -> ApiResult<TransactionPayload> {
    let ctx = state.tx_context();
    let params = form
        .validate(ctx.asset.decimals)
        .map_err(contract_failure)?;
    payload(tx_builder::create_offer(ctx, &params))
}

async fn build_cancel_offer(
    State(state): State<AppState>,
    Json(request): Json<IdRequest>,
) -> ApiResult<TransactionPayload> {
    payload(tx_builder::cancel_offer(state.tx_context(), &request.id))
}

async fn build_request_loan(
    State(state): State<AppState>,
    Json(request): Json<RequestLoanAction>,
) -> ApiResult<TransactionPayload> {
    let ctx = state.tx_context();
    let offer = find_offer(&state, &request.offer_id)?;
    let params = request
        .form
        .validate(&offer, ctx.asset.decimals)
        .map_err(contract_failure)?;
    payload(tx_builder::request_loan(ctx, &params))
}

async fn build_approve_loan(
    State(state): State<AppState>,
    Json(request): Json<IdRequest>,
) -> ApiResult<TransactionPayload> {
    payload(tx_builder::approve_loan(state.tx_context(), &request.id))
}

async fn build_reject_loan(
    State(state): State<AppState>,
    Json(request): Json<IdRequest>,
) -> ApiResult<TransactionPayload> {
    payload(tx_builder::reject_loan(state.tx_context(), &request.id))
}

async fn build_repay_loan(
    State(state): State<AppState>,
    Json(request): Json<IdRequest>,
) -> ApiResult<TransactionPayload> {
    payload(tx_builder::repay_loan(state.tx_context(), &request.id))
}

// =============================================================================
// Signed actions
// =============================================================================

async fn create_offer(
    State(state): State<AppState>,
    Json(form): Json<CreateOfferForm>,
) -> ApiResult<SubmitOutcome> {
    state.actions().create_offer(&form).await.map(Json).map_err(failure)
}

async fn cancel_offer(
    State(state): State<AppState>,
    Json(request): Json<IdRequest>,
) -> ApiResult<SubmitOutcome> {
    state
        .actions()
        .cancel_offer(&request.id)
        .await
        .map(Json)
        .map_err(failure)
}

async fn request_loan(
    State(state): State<AppState>,
    Json(request): Json<RequestLoanAction>,
) -> ApiResult<SubmitOutcome> {
    state
        .actions()
        .request_loan(&request.offer_id, &request.form)
        .await
        .map(Json)
        .map_err(failure)
}

async fn approve_loan(
    State(state): State<AppState>,
    Json(request): Json<IdRequest>,
) -> ApiResult<SubmitOutcome> {
    state
        .actions()
        .approve_loan(&request.id)
        .await
        .map(Json)
        .map_err(failure)
}

async fn reject_loan(
    State(state): State<AppState>,
    Json(request): Json<IdRequest>,
) -> ApiResult<SubmitOutcome> {
    state
        .actions()
        .reject_loan(&request.id)
        .await
        .map(Json)
        .map_err(failure)
}

async fn repay_loan(
    State(state): State<AppState>,
    Json(request): Json<IdRequest>,
) -> ApiResult<SubmitOutcome> {
    state
        .actions()
        .repay_loan(&request.id)
        .await
        .map(Json)
        .map_err(failure)
}
