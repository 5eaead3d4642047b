//! Wallet-signature login

use serde_json::{json, Value};

use crate::{ApiResponse, AuthSession, BackendClient, BackendError};

impl BackendClient {
    /// Ask the backend for a nonce for `address` to sign
    pub async fn request_nonce(&self, address: &str) -> ApiResponse<String> {
        let response: ApiResponse<Value> = self
            .post("/auth/nonce", Some(&json!({ "address": address })))
            .await;
        if !response.is_ok() {
            return ApiResponse {
                data: None,
                error: response.error,
                tx_hash: response.tx_hash,
            };
        }

        match response
            .data
            .as_ref()
            .and_then(|body| body.get("nonce"))
            .and_then(Value::as_str)
        {
            Some(nonce) => ApiResponse::ok(nonce.to_string(), None),
            None => ApiResponse::failed(&BackendError::Decode(
                "response carried no nonce".to_string(),
            )),
        }
    }

    /// Exchange the signed nonce for a bearer token. On success the token
    /// and user are kept for later calls.
    pub async fn authenticate(&self, address: &str, signature: &str) -> ApiResponse<AuthSession> {
        let response: ApiResponse<AuthSession> = self
            .post(
                "/auth/verify",
                Some(&json!({ "address": address, "signature": signature })),
            )
            .await;

        if let Some(AuthSession {
            token: Some(token),
            user,
        }) = &response.data
        {
            self.store_session(token.clone(), user.clone()).await;
            tracing::info!(address = %address, "Authenticated with backend");
        }
        response
    }
}
