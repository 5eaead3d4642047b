//! backend-client: REST client for the aptlend backend
//!
//! Every call resolves to an `ApiResponse { data, error, tx_hash }` instead
//! of an `Err`: the UI shows `error` as-is. The error text is the body's
//! `message` when the backend sent one, else a status-derived message, else
//! the transport error.
//!
//! After `authenticate` succeeds the bearer token is held in memory and sent
//! with every later request until `logout`.

pub mod auth;
pub mod error;
pub mod loans;
pub mod offers;
pub mod types;
pub mod users;

use std::sync::Arc;
use std::time::Duration;

use aptlend_core::BackendConfig;
use reqwest::header::ACCEPT;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;

pub use error::BackendError;
pub use types::*;

#[derive(Debug, Default)]
struct AuthState {
    token: Option<String>,
    user: Option<UserProfile>,
}

#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
    auth: Arc<RwLock<AuthState>>,
}

impl BackendClient {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .user_agent("aptlend")
            .build()
            .map_err(|e| BackendError::Config(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.timeout_secs),
            auth: Arc::new(RwLock::new(AuthState::default())),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn token(&self) -> Option<String> {
        self.auth.read().await.token.clone()
    }

    /// Profile returned by the last successful `authenticate`
    pub async fn current_user(&self) -> Option<UserProfile> {
        self.auth.read().await.user.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.auth.read().await.token.is_some()
    }

    /// Forget the token and cached user
    pub async fn logout(&self) {
        let mut auth = self.auth.write().await;
        auth.token = None;
        auth.user = None;
        tracing::debug!("Backend session cleared");
    }

    async fn store_session(&self, token: String, user: Option<UserProfile>) {
        let mut auth = self.auth.write().await;
        auth.token = Some(token);
        auth.user = user;
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResponse<T> {
        self.call(Method::GET, path, None::<&()>).await
    }

    pub(crate) async fn delete<T: DeserializeOwned>(&self, path: &str) -> ApiResponse<T> {
        self.call(Method::DELETE, path, None::<&()>).await
    }

    pub(crate) async fn post<T, B>(&self, path: &str, body: Option<&B>) -> ApiResponse<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.call(Method::POST, path, body).await
    }

    pub(crate) async fn put<T, B>(&self, path: &str, body: &B) -> ApiResponse<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.call(Method::PUT, path, Some(body)).await
    }

    async fn call<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> ApiResponse<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let result = match self.send(method.clone(), path, body).await {
            Ok(body) => decode(body),
            Err(e) => Err(e),
        };

        match result {
            Ok((data, tx_hash)) => ApiResponse::ok(data, tx_hash),
            Err(e) => {
                tracing::warn!(method = %method, path = %path, error = %e, "Backend request failed");
                ApiResponse::failed(&e)
            }
        }
    }

    async fn send<B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<Value, BackendError>
    where
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self
            .http
            .request(method, &url)
            .header(ACCEPT, "application/json");
        if let Some(token) = self.token().await {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        tracing::debug!(url = %url, "Backend request");
        timed_request(self.timeout, async {
            let response = request.send().await.map_err(transport_error)?;
            let status = response.status();
            let text = response.text().await.map_err(transport_error)?;

            let body = if text.trim().is_empty() {
                Value::Null
            } else {
                serde_json::from_str(&text).unwrap_or(Value::String(text))
            };

            if !status.is_success() {
                return Err(status_error(status, &body));
            }
            Ok(body)
        })
        .await
    }
}

fn decode<T: DeserializeOwned>(body: Value) -> Result<(T, Option<String>), BackendError> {
    let tx_hash = tx_hash_of(&body);
    let data = serde_json::from_value(body).map_err(|e| BackendError::Decode(e.to_string()))?;
    Ok((data, tx_hash))
}

fn tx_hash_of(body: &Value) -> Option<String> {
    body.get("txHash").and_then(Value::as_str).map(str::to_string)
}

/// Wrap a backend request with a timeout
async fn timed_request<T>(
    timeout: Duration,
    fut: impl std::future::Future<Output = Result<T, BackendError>>,
) -> Result<T, BackendError> {
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| BackendError::Timeout {
            secs: timeout.as_secs(),
        })?
}

fn transport_error(e: reqwest::Error) -> BackendError {
    BackendError::Transport {
        message: e.to_string(),
    }
}

fn status_error(status: reqwest::StatusCode, body: &Value) -> BackendError {
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("Request failed with status code {}", status.as_u16()));

    BackendError::Status {
        status: status.as_u16(),
        message,
        tx_hash: tx_hash_of(body),
    }
}
