use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::crypto::address::address_from_program_hash;
use crate::types::Uint168;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum NetworkType {
    #[default]
    Mainnet,
    Testnet,
    Regtest,
}

impl NetworkType {
    pub fn default_rpc_port(&self) -> u16 {
        match self {
            NetworkType::Mainnet => 20606,
            NetworkType::Testnet => 21606,
            NetworkType::Regtest => 22606,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            NetworkType::Mainnet => "mainnet",
            NetworkType::Testnet => "testnet",
            NetworkType::Regtest => "regtest",
        }
    }
}

/// Well-known addresses used by cross-chain transfers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NetworkParams {
    /// Receiver of main chain -> side chain deposits. Empty until configured;
    /// deposits are refused while it is empty.
    pub deposit_address: String,
    /// Burn address for side chain -> main chain withdrawals.
    pub destroy_address: String,
}

impl Default for NetworkParams {
    fn default() -> Self {
        Self {
            deposit_address: String::new(),
            destroy_address: address_from_program_hash(&Uint168::default()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// `host:port` of the node's JSON-RPC listener.
    pub host: String,
    pub username: String,
    pub password: String,
    /// Per-request timeout. `0` leaves the transport default in place.
    pub timeout_secs: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            host: format!("127.0.0.1:{}", NetworkType::Mainnet.default_rpc_port()),
            username: String::new(),
            password: String::new(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    pub keystore: PathBuf,
    /// Directory that receives the `.txn` files.
    pub output_dir: PathBuf,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            keystore: PathBuf::from("keystore.dat"),
            output_dir: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub network: NetworkType,
    pub params: NetworkParams,
    pub rpc: RpcConfig,
    pub logging: LoggingConfig,
    pub wallet: WalletConfig,
}

impl Config {
    pub fn new(network: NetworkType, keystore: Option<PathBuf>) -> Self {
        let mut config = Self {
            network,
            ..Self::default()
        };

        if let Some(path) = keystore {
            config.wallet.keystore = path;
        }

        config.rpc.host = format!("127.0.0.1:{}", network.default_rpc_port());
        config
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Read `path` when it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::from_file(p),
            None => {
                let default_path = get_default_config_path(NetworkType::Mainnet);
                if default_path.exists() {
                    Self::from_file(&default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rpc.host.trim().is_empty() {
            return Err(ConfigError::ValidationError("rpc.host is empty".into()));
        }
        if self.params.destroy_address.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "params.destroy_address is empty".into(),
            ));
        }
        Ok(())
    }

    pub fn rpc_url(&self) -> String {
        format!("http://{}", self.rpc.host)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(msg) => write!(f, "IO error: {}", msg),
            ConfigError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ConfigError::SerializeError(msg) => write!(f, "Serialize error: {}", msg),
            ConfigError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

pub fn get_default_config_path(network: NetworkType) -> PathBuf {
    let base_dir = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("side-cli");

    match network {
        NetworkType::Mainnet => base_dir.join("config.toml"),
        NetworkType::Testnet => base_dir.join("testnet").join("config.toml"),
        NetworkType::Regtest => base_dir.join("regtest").join("config.toml"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.network, NetworkType::Mainnet);
        assert_eq!(config.wallet.keystore, PathBuf::from("keystore.dat"));
        assert_eq!(config.rpc_url(), "http://127.0.0.1:20606");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_network_type_methods() {
        assert_eq!(NetworkType::Testnet.default_rpc_port(), 21606);
        assert_eq!(NetworkType::Regtest.name(), "regtest");
        let testnet = Config::new(NetworkType::Testnet, Some(PathBuf::from("t.dat")));
        assert_eq!(testnet.rpc.host, "127.0.0.1:21606");
        assert_eq!(testnet.wallet.keystore, PathBuf::from("t.dat"));
    }

    #[test]
    fn test_config_serialization() -> Result<(), ConfigError> {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let mut config = Config::new(NetworkType::Regtest, None);
        config.rpc.username = "user".into();
        config.to_file(&config_path)?;

        let loaded = Config::from_file(&config_path)?;
        assert_eq!(loaded.network, NetworkType::Regtest);
        assert_eq!(loaded.rpc.username, "user");
        assert_eq!(loaded.params, config.params);
        Ok(())
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        std::fs::write(&config_path, "network = \"Testnet\"\n").unwrap();

        let loaded = Config::from_file(&config_path).unwrap();
        assert_eq!(loaded.network, NetworkType::Testnet);
        assert_eq!(loaded.params, NetworkParams::default());
    }

    #[test]
    fn test_deposit_address_is_not_invented() {
        let params = NetworkParams::default();
        assert!(params.deposit_address.is_empty());
        assert_eq!(params.destroy_address, address_from_program_hash(&Uint168::default()));

        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        std::fs::write(
            &config_path,
            "[params]\ndeposit_address = \"XQd1DCi6H62NQdWZQhJCRnrPn7sF9CTjaU\"\n",
        )
        .unwrap();
        let loaded = Config::from_file(&config_path).unwrap();
        assert_eq!(loaded.params.deposit_address, "XQd1DCi6H62NQdWZQhJCRnrPn7sF9CTjaU");
        assert_eq!(loaded.params.destroy_address, params.destroy_address);
    }

    #[test]
    fn test_empty_rpc_host_rejected() {
        let mut config = Config::default();
        config.rpc.host = " ".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }
}
