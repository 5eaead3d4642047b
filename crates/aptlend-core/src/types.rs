//! Core type definitions for aptlend

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced when parsing an account address
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("Address is empty")]
    Empty,

    #[error("Address is longer than 32 bytes ({0} hex chars)")]
    TooLong(usize),

    #[error("Invalid hex character '{0}' in address")]
    InvalidCharacter(char),
}

/// Aptos account address (32 bytes, hex-encoded).
///
/// Stored in short canonical form: `0x` prefix, lowercase, leading zeros
/// stripped. `0x0000...01`, `0x01` and `0x1` all parse to the same value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountAddress(String);

impl AccountAddress {
    pub fn parse(input: &str) -> Result<Self, AddressError> {
        let trimmed = input.trim();
        let hex = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if hex.is_empty() {
            return Err(AddressError::Empty);
        }
        if hex.len() > 64 {
            return Err(AddressError::TooLong(hex.len()));
        }
        if let Some(c) = hex.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(AddressError::InvalidCharacter(c));
        }

        let stripped = hex.trim_start_matches('0').to_ascii_lowercase();
        if stripped.is_empty() {
            Ok(Self("0x0".to_string()))
        } else {
            Ok(Self(format!("0x{}", stripped)))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Full 64-hex-char form, as used in resource and function identifiers
    pub fn to_long_string(&self) -> String {
        format!("0x{:0>64}", &self.0[2..])
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AccountAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for AccountAddress {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AccountAddress> for String {
    fn from(addr: AccountAddress) -> Self {
        addr.0
    }
}

/// Compare two address strings as ledger addresses.
///
/// Falls back to exact string comparison when either side is not a valid
/// address, so partially-populated records still filter predictably.
pub fn addresses_match(a: &str, b: &str) -> bool {
    match (AccountAddress::parse(a), AccountAddress::parse(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Transaction hash (32 bytes, hex-encoded)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(pub String);

impl TxHash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Network type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
    Devnet,
    Local,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
            Self::Devnet => "devnet",
            Self::Local => "local",
        }
    }

    /// Public fullnode for this network (without the `/v1` suffix)
    pub fn default_node_url(&self) -> &'static str {
        match self {
            Self::Mainnet => "https://fullnode.mainnet.aptoslabs.com",
            Self::Testnet => "https://fullnode.testnet.aptoslabs.com",
            Self::Devnet => "https://fullnode.devnet.aptoslabs.com",
            Self::Local => "http://127.0.0.1:8080",
        }
    }

    /// Faucet endpoint, if the network has one
    pub fn default_faucet_url(&self) -> Option<&'static str> {
        match self {
            Self::Mainnet => None,
            Self::Testnet => Some("https://faucet.testnet.aptoslabs.com"),
            Self::Devnet => Some("https://faucet.devnet.aptoslabs.com"),
            Self::Local => Some("http://127.0.0.1:8081"),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Self::Mainnet),
            "testnet" => Ok(Self::Testnet),
            "devnet" => Ok(Self::Devnet),
            "local" | "localnet" => Ok(Self::Local),
            other => Err(format!("unknown network '{}'", other)),
        }
    }
}

/// Atomic token amount (USDC: 1 USDC = 1_000_000 units)
pub type AtomicAmount = u64;

/// Constants
pub mod constants {
    /// Decimals of the stable-coin asset the contract lends
    pub const USDC_DECIMALS: u8 = 6;

    /// 1 USDC in atomic units
    pub const ATOMIC_PER_USDC: u64 = 1_000_000;

    /// Deployed lending contract address (testnet)
    pub const DEFAULT_CONTRACT_ADDRESS: &str =
        "0x4733658581be088fe23e99fce8a8de7e8fe975682f402c4394461521aa246706";

    /// Move module holding the lending entry points and resources
    pub const DEFAULT_MODULE_NAME: &str = "lending";

    /// Testnet USDC coin type
    pub const DEFAULT_USDC_COIN: &str =
        "0x5e156f1207d0ebfa19a9eeff00d62a282278fb8719f4fab3a586a0a2c0fffbea::coin::T";

    /// Fee policy: max gas units per transaction
    pub const DEFAULT_MAX_GAS_AMOUNT: u64 = 200_000;

    /// Fee policy: octas per gas unit
    pub const DEFAULT_GAS_UNIT_PRICE: u64 = 100;

    /// Fee policy: transaction expiry after submission
    pub const TX_EXPIRATION_SECS: u64 = 300;
}
