//! Deployment input, output, and on-chain snapshot types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use crate::errors::DeployerError;

/// User intent for one deployment. Built by the resolver, read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentConfig {
    pub token_name: String,
    pub token_symbol: String,
    pub decimals: u8,
    /// Whole tokens. Scaled by `10^decimals` before minting.
    pub initial_supply: TokenAmount,
    pub interest_rate_basis_points: i16,
    pub rate_authority: Option<Pubkey>,
    pub mint_authority: Option<Pubkey>,
    /// `None` means the deployer receives the initial supply.
    pub recipient: Option<Pubkey>,
}

/// A non-negative decimal number of whole tokens, kept as the digits that
/// were typed so scaling to raw units never goes through floating point.
///
/// Normalised: no leading zeros in the integer part, no trailing zeros in
/// the fraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenAmount {
    whole: String,
    fraction: String,
}

impl TokenAmount {
    pub fn whole(&self) -> &str {
        &self.whole
    }

    pub fn fraction(&self) -> &str {
        &self.fraction
    }

    pub fn is_zero(&self) -> bool {
        self.whole == "0" && self.fraction.is_empty()
    }

    /// Nearest `f64`, for display and the echoed record field only.
    pub fn approximate(&self) -> f64 {
        self.to_string().parse().unwrap_or(f64::NAN)
    }
}

impl FromStr for TokenAmount {
    type Err = DeployerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let (whole, fraction) = text.split_once('.').unwrap_or((text, ""));
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty()) || !all_digits(whole) || !all_digits(fraction)
        {
            return Err(DeployerError::Configuration(format!(
                "Invalid initial supply {text:?}: expected a non-negative decimal number"
            )));
        }

        let whole = whole.trim_start_matches('0');
        Ok(Self {
            whole: if whole.is_empty() { "0" } else { whole }.to_string(),
            fraction: fraction.trim_end_matches('0').to_string(),
        })
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fraction.is_empty() {
            write!(f, "{}", self.whole)
        } else {
            write!(f, "{}.{}", self.whole, self.fraction)
        }
    }
}

/// The configuration that actually landed on chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveConfig {
    pub token_name: String,
    pub token_symbol: String,
    pub decimals: u8,
    pub mint_authority: String,
    pub rate_authority: String,
    pub interest_rate_basis_points: i16,
    pub initial_supply: f64,
    /// Raw integer units as text so large supplies survive JSON readers.
    pub total_supply: String,
    /// Epoch seconds.
    pub last_update_timestamp: i64,
}

/// Durable record of a completed deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentResult {
    pub mint_address: String,
    /// Submission order: mint creation first, then the optional mint-to.
    pub transaction_signatures: Vec<String>,
    pub config: EffectiveConfig,
    pub deployment_time: DateTime<Utc>,
}

/// Decoded Token-2022 mint account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintState {
    pub decimals: u8,
    pub supply: u64,
    pub mint_authority: Option<Pubkey>,
    pub interest: Option<InterestBearingState>,
}

/// Decoded `InterestBearingConfig` extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterestBearingState {
    pub rate_authority: Option<Pubkey>,
    pub current_rate: i16,
    pub last_update_timestamp: i64,
}
