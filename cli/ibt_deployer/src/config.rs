//! Application configuration loaded from environment variables.

use std::path::PathBuf;

use crate::errors::{DeployerError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// Solana JSON-RPC endpoint (e.g. https://api.devnet.solana.com)
    pub rpc_url: String,
    /// Solana CLI keypair file used as the deployer identity
    pub keypair_path: PathBuf,
    /// Directory deployment records are written to
    pub deployments_dir: PathBuf,
    /// Cluster name used when building explorer links
    pub cluster: String,
    /// Balance the funding preflight tops the deployer up to
    pub airdrop_lamports: u64,
    /// Per-request RPC timeout in seconds
    pub rpc_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            rpc_url: env_var("RPC_URL")
                .unwrap_or_else(|_| "https://api.devnet.solana.com".to_string()),
            keypair_path: match env_var("KEYPAIR_PATH") {
                Ok(path) => PathBuf::from(path),
                Err(_) => default_keypair_path()?,
            },
            deployments_dir: env_var("DEPLOYMENTS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("deployments")),
            cluster: env_var("CLUSTER").unwrap_or_else(|_| "devnet".to_string()),
            airdrop_lamports: env_var("AIRDROP_LAMPORTS")
                .unwrap_or_else(|_| "2000000000".to_string())
                .replace('_', "")
                .parse()
                .map_err(|_| DeployerError::Configuration("Invalid AIRDROP_LAMPORTS".to_string()))?,
            rpc_timeout_secs: env_var("RPC_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| DeployerError::Configuration("Invalid RPC_TIMEOUT_SECS".to_string()))?,
        })
    }

    /// `https://explorer.solana.com/address/<address>?cluster=<cluster>`
    pub fn explorer_address_url(&self, address: &str) -> String {
        format!(
            "https://explorer.solana.com/address/{address}?cluster={}",
            self.cluster
        )
    }

    /// `https://explorer.solana.com/tx/<signature>?cluster=<cluster>`
    pub fn explorer_tx_url(&self, signature: &str) -> String {
        format!(
            "https://explorer.solana.com/tx/{signature}?cluster={}",
            self.cluster
        )
    }
}

fn default_keypair_path() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| {
        DeployerError::Configuration(
            "Cannot resolve home directory; set KEYPAIR_PATH explicitly".to_string(),
        )
    })?;
    Ok(home.join(".config").join("solana").join("id.json"))
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| DeployerError::Configuration(format!("Missing env var: {key}")))
}
