// devnet-node/src/config.rs
use anyhow::Context;
use devnet_crypto::Address;
use devnet_engine::{Amount, GenesisAccount};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeConfig {
    pub port: u16,
    pub score_root: String,
    pub db_root: String,
    /// Default sender used by client tooling
    pub from: String,
    pub accounts: Vec<AccountConfig>,
    pub log: LogConfig,
    pub rpc: RpcSettings,
}

/// Seed account, kept as raw strings until the node starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountConfig {
    pub name: String,
    pub address: String,
    pub balance: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogConfig {
    pub level: String,
    pub file_path: String,
    /// `console`, `file` or both joined with `|`
    pub output_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RpcSettings {
    pub max_connections: usize,
    pub result_cache_capacity: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            port: 9000,
            score_root: "./.score".into(),
            db_root: "./.db".into(),
            from: format!("hx{}", "a".repeat(40)),
            accounts: vec![
                AccountConfig {
                    name: "genesis".into(),
                    address: format!("hx{}", "0".repeat(40)),
                    balance: "0x2961fff8ca4a62327800000".into(),
                },
                AccountConfig {
                    name: "treasury".into(),
                    address: format!("hx1{}", "0".repeat(39)),
                    balance: "0x0".into(),
                },
            ],
            log: LogConfig::default(),
            rpc: RpcSettings::default(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "debug".into(),
            file_path: "./devnet.log".into(),
            output_type: "console|file".into(),
        }
    }
}

impl Default for RpcSettings {
    fn default() -> Self {
        Self {
            max_connections: 100,
            result_cache_capacity: devnet_rpc::cache::DEFAULT_CAPACITY,
        }
    }
}

impl LogConfig {
    pub fn to_console(&self) -> bool {
        self.outputs().any(|output| output == "console")
    }

    pub fn to_file(&self) -> bool {
        self.outputs().any(|output| output == "file")
    }

    fn outputs(&self) -> impl Iterator<Item = &str> {
        self.output_type.split('|').map(str::trim)
    }
}

impl NodeConfig {
    /// Load a TOML (or `.json`) config; a missing file means defaults
    pub fn load(path: &str) -> anyhow::Result<Self> {
        if !Path::new(path).exists() {
            return Ok(Self::default());
        }
        Self::from_file(path)
    }

    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config {}", path))?;

        let is_json = Path::new(path)
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));

        let config = if is_json {
            serde_json::from_str(&contents).with_context(|| format!("invalid JSON config {}", path))?
        } else {
            toml::from_str(&contents).with_context(|| format!("invalid TOML config {}", path))?
        };
        Ok(config)
    }

    pub fn to_file(&self, path: &str) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }

    /// Parse the seed accounts into engine types
    pub fn genesis_accounts(&self) -> anyhow::Result<Vec<GenesisAccount>> {
        self.accounts
            .iter()
            .map(|account| {
                let address: Address = account
                    .address
                    .parse()
                    .with_context(|| format!("account '{}' has an invalid address", account.name))?;
                let balance = Amount::from_hex(&account.balance)
                    .with_context(|| format!("account '{}' has an invalid balance {}", account.name, account.balance))?;

                Ok(GenesisAccount {
                    name: account.name.clone(),
                    address,
                    balance,
                })
            })
            .collect()
    }
}
