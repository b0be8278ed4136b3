//! CLI configuration management

use std::path::{Path, PathBuf};

use ethkit_sdk::PipelineConfig;
use serde::{Deserialize, Serialize};

use crate::CliError;

/// CLI configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// RPC endpoint URL
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// Expected chain id; queried from the node when unset
    #[serde(default)]
    pub chain_id: Option<u64>,
    /// Gas limit for transfers
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,
    /// Gas limit for contract creation
    #[serde(default = "default_deploy_gas_limit")]
    pub deploy_gas_limit: u64,
    /// Gas limit for contract calls
    #[serde(default = "default_call_gas_limit")]
    pub call_gas_limit: u64,
    /// Receipt polling and subscription tuning
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

fn default_rpc_url() -> String {
    "http://localhost:8545".to_string()
}

fn default_gas_limit() -> u64 {
    21000
}

fn default_deploy_gas_limit() -> u64 {
    500_000
}

fn default_call_gas_limit() -> u64 {
    100_000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            chain_id: None,
            gas_limit: default_gas_limit(),
            deploy_gas_limit: default_deploy_gas_limit(),
            call_gas_limit: default_call_gas_limit(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl Config {
    /// `~/.ethkit`
    pub fn config_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".ethkit"))
    }

    /// `~/.ethkit/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("config.toml"))
    }

    /// Load from `path`, or from the default location.
    ///
    /// A missing default file yields the defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, CliError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) if path.exists() => path,
                _ => return Ok(Self::default()),
            },
        };

        let content = std::fs::read_to_string(&path)
            .map_err(|e| CliError::Config(format!("{}: {e}", path.display())))?;
        toml::from_str(&content).map_err(|e| CliError::Config(format!("{}: {e}", path.display())))
    }

    /// Write to `path`, or to the default location
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf, CliError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()
                .ok_or_else(|| CliError::Config("cannot determine home directory".to_string()))?,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| CliError::Config(e.to_string()))?;
        std::fs::write(&path, content)?;
        Ok(path)
    }
}
