//! Off-chain loan records and the backend-driven loan lifecycle

use serde_json::{json, Value};

use crate::{ApiResponse, BackendClient, NewLoanRequest};

impl BackendClient {
    pub async fn list_loans(&self) -> ApiResponse<Vec<Value>> {
        self.get("/loans").await
    }

    pub async fn get_loan(&self, loan_id: &str) -> ApiResponse<Value> {
        self.get(&format!("/loans/{}", loan_id)).await
    }

    pub async fn request_loan(&self, request: &NewLoanRequest) -> ApiResponse<Value> {
        self.post("/loans/request", Some(request)).await
    }

    /// Lender approves and disburses
    pub async fn approve_loan(&self, loan_id: &str) -> ApiResponse<Value> {
        self.post(&format!("/loans/{}/approve", loan_id), None::<&()>)
            .await
    }

    /// Borrower records a repayment of `amount` atomic units
    pub async fn record_repayment(&self, loan_id: &str, amount: u64) -> ApiResponse<Value> {
        self.post(
            &format!("/loans/{}/repay", loan_id),
            Some(&json!({ "amount": amount })),
        )
        .await
    }

    pub async fn liquidate_loan(&self, loan_id: &str) -> ApiResponse<Value> {
        self.post(&format!("/loans/{}/liquidate", loan_id), None::<&()>)
            .await
    }

    pub async fn borrower_loans(&self, borrower: &str) -> ApiResponse<Vec<Value>> {
        self.get(&format!("/loans/borrower/{}", borrower)).await
    }

    pub async fn lender_loans(&self, lender: &str) -> ApiResponse<Vec<Value>> {
        self.get(&format!("/loans/lender/{}", lender)).await
    }
}
