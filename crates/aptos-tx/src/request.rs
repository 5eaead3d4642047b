//! Unsigned and signed transaction requests

use aptlend_core::constants::{
    DEFAULT_GAS_UNIT_PRICE, DEFAULT_MAX_GAS_AMOUNT, TX_EXPIRATION_SECS,
};
use serde::{Deserialize, Serialize};

use crate::payload::TransactionPayload;

/// Fee policy applied to every submitted transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOptions {
    pub max_gas_amount: u64,
    pub gas_unit_price: u64,
    /// Seconds after submission before the node drops the transaction
    pub expiration_secs: u64,
}

impl Default for TxOptions {
    fn default() -> Self {
        Self {
            max_gas_amount: DEFAULT_MAX_GAS_AMOUNT,
            gas_unit_price: DEFAULT_GAS_UNIT_PRICE,
            expiration_secs: TX_EXPIRATION_SECS,
        }
    }
}

impl TxOptions {
    /// Absolute expiry timestamp (unix seconds) counted from now
    pub fn expiration_timestamp(&self) -> u64 {
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        now + self.expiration_secs
    }
}

/// Transaction request before signing, as accepted by
/// `/transactions/encode_submission`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserTransactionRequest {
    pub sender: String,
    #[serde(with = "crate::u64_string")]
    pub sequence_number: u64,
    #[serde(with = "crate::u64_string")]
    pub max_gas_amount: u64,
    #[serde(with = "crate::u64_string")]
    pub gas_unit_price: u64,
    #[serde(with = "crate::u64_string")]
    pub expiration_timestamp_secs: u64,
    pub payload: TransactionPayload,
}

impl UserTransactionRequest {
    pub fn new(
        sender: impl Into<String>,
        sequence_number: u64,
        payload: impl Into<TransactionPayload>,
        options: &TxOptions,
    ) -> Self {
        Self {
            sender: sender.into(),
            sequence_number,
            max_gas_amount: options.max_gas_amount,
            gas_unit_price: options.gas_unit_price,
            expiration_timestamp_secs: options.expiration_timestamp(),
            payload: payload.into(),
        }
    }

    pub fn with_signature(self, signature: TransactionSignature) -> SubmitTransactionRequest {
        SubmitTransactionRequest {
            request: self,
            signature,
        }
    }
}

/// Signature attached to a submitted transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransactionSignature {
    Ed25519Signature(Ed25519Signature),
}

/// Hex-encoded Ed25519 public key and signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ed25519Signature {
    pub public_key: String,
    pub signature: String,
}

impl Ed25519Signature {
    pub fn from_bytes(public_key: &[u8], signature: &[u8]) -> Self {
        Self {
            public_key: format!("0x{}", hex::encode(public_key)),
            signature: format!("0x{}", hex::encode(signature)),
        }
    }
}

impl From<Ed25519Signature> for TransactionSignature {
    fn from(sig: Ed25519Signature) -> Self {
        Self::Ed25519Signature(sig)
    }
}

/// Body of `POST /transactions`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitTransactionRequest {
    #[serde(flatten)]
    pub request: UserTransactionRequest,
    pub signature: TransactionSignature,
}

/// Decode the hex signing message returned by `/transactions/encode_submission`
pub fn decode_signing_message(encoded: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let trimmed = encoded.trim().trim_matches('"');
    hex::decode(trimmed.strip_prefix("0x").unwrap_or(trimmed))
}
