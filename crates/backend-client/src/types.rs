//! Request and response bodies of the backend. The backend speaks camelCase.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::BackendError;

/// Uniform result of every backend call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse<T> {
    pub data: Option<T>,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T, tx_hash: Option<String>) -> Self {
        Self {
            data: Some(data),
            error: None,
            tx_hash,
        }
    }

    pub fn failed(error: &BackendError) -> Self {
        Self {
            data: None,
            error: Some(error.to_string()),
            tx_hash: error.tx_hash().map(str::to_string),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<T, String> {
        match (self.data, self.error) {
            (Some(data), None) => Ok(data),
            (_, Some(error)) => Err(error),
            (None, None) => Err("empty response".to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_score: Option<u32>,
    pub is_lender: bool,
    pub is_borrower: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSession {
    pub token: Option<String>,
    pub user: Option<UserProfile>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOffer {
    pub amount: u64,
    pub interest_rate: u64,
    pub duration_days: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collateral_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_credit_score: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLoanRequest {
    pub offer_id: String,
    pub amount: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collateral_amount: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collateral_value: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub borrower_doc_hash: Option<String>,
}

/// Partial profile update; unset fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_score: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_lender: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_borrower: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditScore {
    pub score: u32,
    #[serde(default)]
    pub last_updated: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityKind {
    LoanCreated,
    LoanRepaid,
    OfferCreated,
    OfferAccepted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub timestamp: String,
    #[serde(default)]
    pub data: Value,
}
