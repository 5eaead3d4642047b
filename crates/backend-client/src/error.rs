use thiserror::Error;

/// Failure of a single backend call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("{message}")]
    Transport { message: String },

    #[error("Backend request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Non-2xx response. `message` is the body's `message` when it has one.
    #[error("{message}")]
    Status {
        status: u16,
        message: String,
        tx_hash: Option<String>,
    },

    #[error("Failed to decode backend response: {0}")]
    Decode(String),

    #[error("Invalid backend configuration: {0}")]
    Config(String),
}

impl BackendError {
    /// Transaction hash the backend reported alongside a failure
    pub fn tx_hash(&self) -> Option<&str> {
        match self {
            Self::Status { tx_hash, .. } => tx_hash.as_deref(),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
