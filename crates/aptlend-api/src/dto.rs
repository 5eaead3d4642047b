//! Data Transfer Objects for API requests and responses

use aptlend_core::{ContractError, Error, WalletError};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Node status response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeStatusResponse {
    pub connected: bool,
    pub url: String,
    pub network: String,
    pub chain_id: Option<u8>,
    pub ledger_version: Option<u64>,
    pub block_height: Option<u64>,
    pub faucet_url: Option<String>,
}

/// Query for `GET /contract/offers`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OffersQuery {
    pub lender: Option<String>,
}

/// Query for `GET /contract/loans`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoansQuery {
    pub borrower: Option<String>,
    pub offer_id: Option<String>,
}

/// Query for `GET /contract/my-loans`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MyLoansQuery {
    pub address: Option<String>,
}

/// Body naming a single offer or loan request
#[derive(Debug, Clone, Deserialize)]
pub struct IdRequest {
    pub id: String,
}

/// Body for `POST /contract/actions/request-loan`
#[derive(Debug, Clone, Deserialize)]
pub struct RequestLoanAction {
    pub offer_id: String,
    #[serde(flatten)]
    pub form: lending::LoanRequestForm,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectRequest {
    pub wallet: String,
}

/// Generic API error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }
}

/// Error half of every handler result
pub type ApiFailure = (StatusCode, Json<ApiError>);

pub type ApiResult<T> = Result<Json<T>, ApiFailure>;

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

pub fn contract_failure(error: ContractError) -> ApiFailure {
    (
        status(error.status_code()),
        Json(ApiError::new(error.error_code(), error.to_string())),
    )
}

pub fn wallet_failure(error: WalletError) -> ApiFailure {
    (
        status(error.status_code()),
        Json(ApiError::new(error.error_code(), error.to_string())),
    )
}

pub fn failure(error: Error) -> ApiFailure {
    match error {
        Error::Contract(e) => contract_failure(e),
        Error::Wallet(e) => wallet_failure(e),
        Error::Node(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiError::new("node_error", e.to_string())),
        ),
        Error::Transaction(e) => (
            StatusCode::BAD_GATEWAY,
            Json(ApiError::new("transaction_error", e.to_string())),
        ),
        Error::Config(_) | Error::Serialization(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiError::internal(error.to_string())),
        ),
    }
}
