//! Response shapes returned by the fullnode

use aptos_tx::u64_string;
use serde::{Deserialize, Serialize};

/// `GET /v1` ledger information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerInfo {
    pub chain_id: u8,
    #[serde(with = "u64_string")]
    pub epoch: u64,
    #[serde(with = "u64_string")]
    pub ledger_version: u64,
    #[serde(with = "u64_string")]
    pub oldest_ledger_version: u64,
    /// Microseconds since the unix epoch
    #[serde(with = "u64_string")]
    pub ledger_timestamp: u64,
    pub node_role: String,
    #[serde(with = "u64_string")]
    pub block_height: u64,
}

/// `GET /v1/accounts/{address}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountInfo {
    #[serde(with = "u64_string")]
    pub sequence_number: u64,
    pub authentication_key: String,
}

/// `GET /v1/accounts/{address}/resource/{type}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountResource {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub data: serde_json::Value,
}

/// Error body returned by the fullnode on non-2xx responses
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub vm_error_code: Option<u64>,
}

/// Table item lookup body for `POST /v1/tables/{handle}/item`
#[derive(Debug, Clone, Serialize)]
pub struct TableItemRequest {
    pub key_type: String,
    pub value_type: String,
    pub key: serde_json::Value,
}

/// Outcome of a transaction as reported by the node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionStatus {
    Pending,
    Committed { success: bool, vm_status: String },
}

impl TransactionStatus {
    /// Classify a transaction JSON object (`pending_transaction` vs
    /// `user_transaction`)
    pub fn from_json(tx: &serde_json::Value) -> Self {
        if tx["type"].as_str() == Some("pending_transaction") {
            return Self::Pending;
        }
        Self::Committed {
            success: tx["success"].as_bool().unwrap_or(false),
            vm_status: tx["vm_status"].as_str().unwrap_or_default().to_string(),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ledger_info_parses_string_numbers() {
        let info: LedgerInfo = serde_json::from_value(json!({
            "chain_id": 2,
            "epoch": "9081",
            "ledger_version": "6021413870",
            "oldest_ledger_version": "0",
            "ledger_timestamp": "1729000000000000",
            "node_role": "full_node",
            "oldest_block_height": "0",
            "block_height": "412000000",
            "git_hash": "abc"
        }))
        .unwrap();

        assert_eq!(info.chain_id, 2);
        assert_eq!(info.ledger_version, 6_021_413_870);
        assert_eq!(info.block_height, 412_000_000);
    }

    #[test]
    fn test_transaction_status() {
        assert!(TransactionStatus::from_json(&json!({"type": "pending_transaction"})).is_pending());
        assert_eq!(
            TransactionStatus::from_json(&json!({
                "type": "user_transaction",
                "success": false,
                "vm_status": "Move abort in 0x1::lending: E_OFFER_CLOSED(0x3)"
            })),
            TransactionStatus::Committed {
                success: false,
                vm_status: "Move abort in 0x1::lending: E_OFFER_CLOSED(0x3)".to_string()
            }
        );
    }
}
