//! Error types for aptlend

use thiserror::Error;

/// Core errors that can occur in aptlend
#[derive(Debug, Error)]
pub enum Error {
    #[error("Node error: {0}")]
    Node(#[from] NodeError),

    #[error("Contract error: {0}")]
    Contract(#[from] ContractError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] TxError),

    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Fullnode connection and query errors
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Node unreachable at {url}")]
    Unreachable { url: String },

    #[error("Node returned error: {message}")]
    ApiError { message: String },

    #[error("Node request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("Resource not found: {resource}")]
    ResourceNotFound { resource: String },

    #[error("Transaction not found: {hash}")]
    TransactionNotFound { hash: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

impl NodeError {
    /// Whether the error means "nothing published there yet" rather than a failure
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ResourceNotFound { .. } | Self::TransactionNotFound { .. }
        )
    }
}

/// Lending contract errors (client side)
#[derive(Debug, Error)]
pub enum ContractError {
    #[error("Invalid amount: {message}")]
    InvalidAmount { message: String },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Failed to fetch contract data: {message}")]
    FetchFailed { message: String },

    #[error("Failed to decode {resource}: {message}")]
    Decode { resource: String, message: String },

    #[error("Action not allowed: {reason}")]
    ActionNotAllowed { reason: String },

    #[error("Unknown offer {offer_id}")]
    OfferNotFound { offer_id: String },
}

impl ContractError {
    /// Get an HTTP-friendly error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAmount { .. } => "invalid_amount",
            Self::InvalidArgument { .. } => "invalid_argument",
            Self::FetchFailed { .. } => "fetch_failed",
            Self::Decode { .. } => "decode_error",
            Self::ActionNotAllowed { .. } => "action_not_allowed",
            Self::OfferNotFound { .. } => "not_found",
        }
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidAmount { .. } | Self::InvalidArgument { .. } => 400,
            Self::ActionNotAllowed { .. } => 409,
            Self::OfferNotFound { .. } => 404,
            Self::FetchFailed { .. } | Self::Decode { .. } => 503,
        }
    }
}

/// Transaction building, signing and submission errors
#[derive(Debug, Error)]
pub enum TxError {
    #[error("Failed to build transaction: {message}")]
    BuildFailed { message: String },

    #[error("Failed to sign transaction: {message}")]
    SigningFailed { message: String },

    #[error("Transaction submission failed: {message}")]
    SubmissionFailed { message: String },

    #[error("Transaction failed on chain: {vm_status}")]
    Rejected { vm_status: String },

    #[error("Timed out waiting for transaction {hash}")]
    ConfirmationTimeout { hash: String },
}

/// Wallet session errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("Please connect your wallet first")]
    NotConnected,

    #[error("Wallet is busy ({state}), try again once it settles")]
    Busy { state: String },

    #[error("Wallet already connected")]
    AlreadyConnected,

    #[error("Wallet plugin not found: {name}")]
    PluginNotFound { name: String },

    #[error("Failed to connect wallet: {message}")]
    ConnectFailed { message: String },

    #[error("Failed to disconnect wallet: {message}")]
    DisconnectFailed { message: String },

    #[error("Wallet {plugin} cannot sign transactions")]
    SigningUnsupported { plugin: String },

    #[error("Wallet rejected signing: {message}")]
    SigningRejected { message: String },
}

impl WalletError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotConnected => "wallet_not_connected",
            Self::Busy { .. } => "wallet_busy",
            Self::AlreadyConnected => "wallet_already_connected",
            Self::PluginNotFound { .. } => "wallet_plugin_not_found",
            Self::ConnectFailed { .. } => "wallet_connect_failed",
            Self::DisconnectFailed { .. } => "wallet_disconnect_failed",
            Self::SigningUnsupported { .. } => "wallet_signing_unsupported",
            Self::SigningRejected { .. } => "wallet_signing_rejected",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotConnected => 401,
            Self::Busy { .. } | Self::AlreadyConnected => 409,
            Self::PluginNotFound { .. } => 404,
            Self::SigningUnsupported { .. } => 422,
            Self::ConnectFailed { .. }
            | Self::DisconnectFailed { .. }
            | Self::SigningRejected { .. } => 502,
        }
    }
}

/// Result type alias for aptlend operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_error_codes() {
        let err = ContractError::InvalidAmount {
            message: "test".into(),
        };
        assert_eq!(err.error_code(), "invalid_amount");
        assert_eq!(err.status_code(), 400);

        let err = ContractError::FetchFailed {
            message: "connection refused".into(),
        };
        assert_eq!(err.status_code(), 503);
        assert_eq!(
            err.to_string(),
            "Failed to fetch contract data: connection refused"
        );
    }

    #[test]
    fn test_unknown_offer_is_not_found() {
        let err = ContractError::OfferNotFound {
            offer_id: "77".into(),
        };
        assert_eq!(err.error_code(), "not_found");
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.to_string(), "Unknown offer 77");
    }

    #[test]
    fn test_wallet_not_connected_message() {
        let err = WalletError::NotConnected;
        assert_eq!(err.to_string(), "Please connect your wallet first");
        assert_eq!(err.status_code(), 401);
    }

    #[test]
    fn test_not_found_detection() {
        let err = NodeError::ResourceNotFound {
            resource: "0x1::lending::Offers".into(),
        };
        assert!(err.is_not_found());
        assert!(!NodeError::Timeout { secs: 30 }.is_not_found());
    }
}
