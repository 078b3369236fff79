//! Application-wide error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeployerError {
    /// Malformed or missing user input. Raised before any network call.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Submission, confirmation or query failure against the RPC node.
    #[error("Network error: {0}")]
    Network(String),

    /// Signer does not match the authority the program expects.
    #[error("Authorization error: {0}")]
    Authorization(String),

    /// Faucet refused or failed the airdrop request.
    #[error("Faucet error: {0}")]
    Faucet(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DeployerError>;
