//! aptos-node-client: REST client for an Aptos fullnode
//!
//! Thin typed wrapper over the fullnode's `/v1` JSON API. Every call is
//! bounded by a request timeout and node failures are mapped onto
//! `NodeError` so callers can tell "missing" apart from "unreachable".

pub mod submit;
pub mod types;

use std::time::Duration;

use aptlend_core::{NodeConfig, NodeError};
use aptos_tx::{SubmitTransactionRequest, UserTransactionRequest};
use async_trait::async_trait;
use serde::de::DeserializeOwned;

pub use submit::{submit_transaction, SubmitOutcome};
pub use types::*;

/// Default timeout for node API calls (30 seconds).
const NODE_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Pause between polls while a submitted transaction is still pending
const PENDING_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Result type for node client operations
pub type Result<T> = std::result::Result<T, NodeError>;

/// Read access to on-chain state.
///
/// The poller depends on this instead of `NodeClient` so tests can swap in
/// an in-memory ledger.
#[async_trait]
pub trait ResourceReader: Send + Sync {
    /// `data` of a resource, or `None` when the account does not hold it
    async fn read_resource(
        &self,
        address: &str,
        resource_type: &str,
    ) -> Result<Option<serde_json::Value>>;

    /// Value of a table entry, or `None` when the key is absent
    async fn read_table_item(
        &self,
        handle: &str,
        key_type: &str,
        value_type: &str,
        key: serde_json::Value,
    ) -> Result<Option<serde_json::Value>>;
}

/// High-level Aptos fullnode client
#[derive(Clone)]
pub struct NodeClient {
    http: reqwest::Client,
    config: NodeConfig,
    timeout: Duration,
}

impl NodeClient {
    pub fn new(config: NodeConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("aptlend")
            .build()
            .map_err(|e| NodeError::Unreachable {
                url: format!("{}: {}", config.url, e),
            })?;

        Ok(Self {
            http,
            config,
            timeout: NODE_REQUEST_TIMEOUT,
        })
    }

    /// Override the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Get the current node configuration
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v1{}", self.config.url.trim_end_matches('/'), path)
    }

    /// Get ledger info from `GET /v1`
    pub async fn ledger_info(&self) -> Result<LedgerInfo> {
        self.get_json(&self.endpoint("")).await
    }

    /// Check if node is online
    pub async fn is_online(&self) -> bool {
        self.ledger_info().await.is_ok()
    }

    pub async fn get_account(&self, address: &str) -> Result<AccountInfo> {
        self.get_json(&self.endpoint(&format!("/accounts/{}", address)))
            .await
    }

    /// Next sequence number the account must use
    pub async fn sequence_number(&self, address: &str) -> Result<u64> {
        Ok(self.get_account(address).await?.sequence_number)
    }

    /// Get a resource published under an account.
    ///
    /// Returns `Ok(None)` when the account or the resource does not exist.
    pub async fn get_account_resource(
        &self,
        address: &str,
        resource_type: &str,
    ) -> Result<Option<AccountResource>> {
        let url = self.endpoint(&format!("/accounts/{}/resource/{}", address, resource_type));
        match self.get_json(&url).await {
            Ok(resource) => Ok(Some(resource)),
            Err(NodeError::ResourceNotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Look up a single table entry.
    ///
    /// Returns `Ok(None)` when the key is absent.
    pub async fn get_table_item(
        &self,
        handle: &str,
        key_type: &str,
        value_type: &str,
        key: serde_json::Value,
    ) -> Result<Option<serde_json::Value>> {
        let url = self.endpoint(&format!("/tables/{}/item", handle));
        let body = TableItemRequest {
            key_type: key_type.to_string(),
            value_type: value_type.to_string(),
            key,
        };
        match self.send_json(self.http.post(&url).json(&body), &url).await {
            Ok(value) => Ok(Some(value)),
            Err(NodeError::ResourceNotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Ask the node for the BCS signing message of an unsigned request
    pub async fn encode_submission(&self, request: &UserTransactionRequest) -> Result<Vec<u8>> {
        let url = self.endpoint("/transactions/encode_submission");
        let encoded: String = self
            .send_json(self.http.post(&url).json(request), &url)
            .await?;
        aptos_tx::decode_signing_message(&encoded)
            .map_err(|e| NodeError::ParseError(format!("signing message: {}", e)))
    }

    /// Submit a signed transaction; returns the pending transaction JSON
    pub async fn submit(&self, request: &SubmitTransactionRequest) -> Result<serde_json::Value> {
        let url = self.endpoint("/transactions");
        self.send_json(self.http.post(&url).json(request), &url)
            .await
    }

    pub async fn get_transaction_by_hash(&self, hash: &str) -> Result<serde_json::Value> {
        self.get_json(&self.endpoint(&format!("/transactions/by_hash/{}", hash)))
            .await
    }

    /// Wait until the node reports the transaction committed (successfully
    /// or not), giving up after `max_wait`.
    pub async fn wait_for_transaction(
        &self,
        hash: &str,
        max_wait: Duration,
    ) -> Result<serde_json::Value> {
        let deadline = tokio::time::Instant::now() + max_wait;
        let wait_url = self.endpoint(&format!("/transactions/wait_by_hash/{}", hash));

        loop {
            let tx = match self.get_json::<serde_json::Value>(&wait_url).await {
                Ok(tx) => tx,
                // Not yet visible to this node
                Err(NodeError::TransactionNotFound { .. }) => serde_json::json!({
                    "type": "pending_transaction"
                }),
                Err(e) => return Err(e),
            };

            if !TransactionStatus::from_json(&tx).is_pending() {
                return Ok(tx);
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(NodeError::Timeout {
                    secs: max_wait.as_secs(),
                });
            }
            tracing::debug!(hash = %hash, "Transaction still pending");
            tokio::time::sleep(PENDING_POLL_INTERVAL).await;
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.send_json(self.http.get(url), url).await
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        url: &str,
    ) -> Result<T> {
        timed_request(self.timeout, async {
            let response = request.send().await.map_err(|e| transport_error(url, e))?;
            let status = response.status();
            let body = response.text().await.map_err(|e| transport_error(url, e))?;

            if !status.is_success() {
                return Err(status_error(status, &body, url));
            }

            serde_json::from_str(&body).map_err(|e| NodeError::ParseError(e.to_string()))
        })
        .await
    }
}

#[async_trait]
impl ResourceReader for NodeClient {
    async fn read_resource(
        &self,
        address: &str,
        resource_type: &str,
    ) -> Result<Option<serde_json::Value>> {
        Ok(self
            .get_account_resource(address, resource_type)
            .await?
            .map(|r| r.data))
    }

    async fn read_table_item(
        &self,
        handle: &str,
        key_type: &str,
        value_type: &str,
        key: serde_json::Value,
    ) -> Result<Option<serde_json::Value>> {
        self.get_table_item(handle, key_type, value_type, key).await
    }
}

/// Wrap a node request with a timeout
async fn timed_request<T>(
    timeout: Duration,
    fut: impl std::future::Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| NodeError::Timeout {
            secs: timeout.as_secs(),
        })?
}

fn transport_error(url: &str, e: reqwest::Error) -> NodeError {
    if e.is_connect() {
        NodeError::Unreachable {
            url: url.to_string(),
        }
    } else if e.is_timeout() {
        NodeError::Timeout {
            secs: NODE_REQUEST_TIMEOUT.as_secs(),
        }
    } else {
        NodeError::ApiError {
            message: e.to_string(),
        }
    }
}

/// Map a non-2xx response onto `NodeError`
fn status_error(status: reqwest::StatusCode, body: &str, url: &str) -> NodeError {
    let parsed: NodeErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = if parsed.message.is_empty() {
        format!("HTTP {} from {}", status.as_u16(), url)
    } else {
        parsed.message.clone()
    };

    if status == reqwest::StatusCode::NOT_FOUND {
        return match parsed.error_code.as_deref() {
            Some("transaction_not_found") => NodeError::TransactionNotFound {
                hash: url.rsplit('/').next().unwrap_or_default().to_string(),
            },
            _ => NodeError::ResourceNotFound { resource: message },
        };
    }

    NodeError::ApiError { message }
}
