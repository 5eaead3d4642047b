//! Configuration types for aptlend

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::{AccountAddress, Error, Network};

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "APTLEND_";

/// Fullnode connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Fullnode REST URL without the `/v1` suffix
    pub url: String,

    /// Faucet URL (testnets only)
    #[serde(default)]
    pub faucet_url: Option<String>,
}

impl NodeConfig {
    pub fn for_network(network: Network) -> Self {
        Self {
            url: network.default_node_url().to_string(),
            faucet_url: network.default_faucet_url().map(str::to_string),
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self::for_network(Network::Testnet)
    }
}

/// Deployed lending contract
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractConfig {
    pub address: String,
    #[serde(default = "default_module_name")]
    pub module_name: String,
}

fn default_module_name() -> String {
    constants::DEFAULT_MODULE_NAME.to_string()
}

impl ContractConfig {
    /// Fully qualified `<address>::<module>::<name>` identifier
    pub fn qualified(&self, name: &str) -> String {
        format!("{}::{}::{}", self.address, self.module_name, name)
    }
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            address: constants::DEFAULT_CONTRACT_ADDRESS.to_string(),
            module_name: default_module_name(),
        }
    }
}

/// Lent asset. The contract only supports one stable coin today; the decimals
/// travel with the coin type so amount helpers never hardcode the scale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetConfig {
    pub coin_type: String,
    pub decimals: u8,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            coin_type: constants::DEFAULT_USDC_COIN.to_string(),
            decimals: constants::USDC_DECIMALS,
        }
    }
}

/// Off-chain lending backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub base_url: String,
    #[serde(default = "default_backend_timeout")]
    pub timeout_secs: u64,
}

fn default_backend_timeout() -> u64 {
    30
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3001/api".to_string(),
            timeout_secs: default_backend_timeout(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Network (mainnet, testnet, devnet, local)
    pub network: Network,

    /// Fullnode connection settings
    pub node: NodeConfig,

    /// Lending contract location
    #[serde(default)]
    pub contract: ContractConfig,

    /// Lent asset
    #[serde(default)]
    pub asset: AssetConfig,

    /// REST backend
    #[serde(default)]
    pub backend: BackendConfig,

    /// Contract poll interval
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Local API server port
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Account to watch when no wallet plugin is connected yet
    #[serde(default)]
    pub account: Option<String>,
}

fn default_poll_interval() -> u64 {
    5
}

fn default_api_port() -> u16 {
    19080
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            network: Network::Testnet,
            node: NodeConfig::default(),
            contract: ContractConfig::default(),
            asset: AssetConfig::default(),
            backend: BackendConfig::default(),
            poll_interval_secs: default_poll_interval(),
            api_port: default_api_port(),
            account: None,
        }
    }
}

impl AppConfig {
    /// Defaults overlaid with `APTLEND_*` process environment variables
    pub fn from_env() -> Result<Self, Error> {
        let vars: HashMap<String, String> = std::env::vars()
            .filter(|(k, _)| k.starts_with(ENV_PREFIX))
            .collect();
        Self::from_vars(&vars)
    }

    /// Defaults overlaid with the given variables.
    ///
    /// Choosing a network resets node and faucet URLs to that network's
    /// public endpoints unless they are set explicitly.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, Error> {
        let get = |key: &str| {
            vars.get(&format!("{}{}", ENV_PREFIX, key))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Self::default();

        if let Some(network) = get("NETWORK") {
            config.network = network.parse().map_err(Error::Config)?;
            config.node = NodeConfig::for_network(config.network);
        }
        if let Some(url) = get("NODE_URL") {
            config.node.url = url.trim_end_matches('/').to_string();
        }
        if let Some(url) = get("FAUCET_URL") {
            config.node.faucet_url = Some(url);
        }
        if let Some(address) = get("CONTRACT_ADDRESS") {
            AccountAddress::parse(&address)
                .map_err(|e| Error::Config(format!("APTLEND_CONTRACT_ADDRESS: {}", e)))?;
            config.contract.address = address;
        }
        if let Some(module) = get("MODULE_NAME") {
            config.contract.module_name = module;
        }
        if let Some(coin) = get("COIN_TYPE") {
            config.asset.coin_type = coin;
        }
        if let Some(decimals) = get("COIN_DECIMALS") {
            config.asset.decimals = parse_var("COIN_DECIMALS", &decimals)?;
        }
        if let Some(url) = get("BACKEND_URL") {
            config.backend.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(secs) = get("BACKEND_TIMEOUT_SECS") {
            config.backend.timeout_secs = parse_secs("BACKEND_TIMEOUT_SECS", &secs)?;
        }
        if let Some(secs) = get("POLL_INTERVAL_SECS") {
            config.poll_interval_secs = parse_secs("POLL_INTERVAL_SECS", &secs)?;
        }
        if let Some(port) = get("API_PORT") {
            config.api_port = parse_var("API_PORT", &port)?;
        }
        if let Some(account) = get("ACCOUNT") {
            let addr = AccountAddress::parse(&account)
                .map_err(|e| Error::Config(format!("APTLEND_ACCOUNT: {}", e)))?;
            config.account = Some(addr.to_string());
        }

        Ok(config)
    }
}

/// Whole seconds, at least 1
fn parse_secs(key: &str, value: &str) -> Result<u64, Error> {
    let secs: u64 = parse_var(key, value)?;
    if secs == 0 {
        return Err(Error::Config(format!("{}{} must be at least 1", ENV_PREFIX, key)));
    }
    Ok(secs)
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, Error>
where
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| Error::Config(format!("{}{}: {}", ENV_PREFIX, key, e)))
}
