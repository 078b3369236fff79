//! Token presets and resolution of user input into a [`DeploymentConfig`].

use std::str::FromStr;

use solana_sdk::pubkey::Pubkey;

use crate::errors::{DeployerError, Result};
use crate::types::{DeploymentConfig, TokenAmount};

pub const DEFAULT_DECIMALS: u8 = 6;
pub const DEFAULT_INITIAL_SUPPLY: &str = "1000000";
/// Raw amounts are `u64`, so more decimals leave almost no room for supply.
pub const MAX_DECIMALS: u8 = 18;

/// A named, immutable preset. Never carries authorities or a recipient.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Template {
    pub key: &'static str,
    pub token_name: &'static str,
    pub token_symbol: &'static str,
    pub decimals: u8,
    /// Whole tokens, decimal text.
    pub initial_supply: &'static str,
    pub interest_rate_basis_points: i16,
}

pub static TEMPLATES: [Template; 3] = [
    Template {
        key: "usdc",
        token_name: "USD Coin Test",
        token_symbol: "USDC-TEST",
        decimals: 6,
        initial_supply: "1000000",
        interest_rate_basis_points: 500,
    },
    Template {
        key: "usdt",
        token_name: "Tether Test",
        token_symbol: "USDT-TEST",
        decimals: 6,
        initial_supply: "500000",
        interest_rate_basis_points: 300,
    },
    Template {
        key: "dai",
        token_name: "Dai Stablecoin Test",
        token_symbol: "DAI-TEST",
        decimals: 18,
        initial_supply: "10",
        interest_rate_basis_points: 400,
    },
];

impl Template {
    /// Look a template up by key (`usdc`), symbol (`USDC-TEST`) or constant
    /// style name (`USDC_TEST`), ignoring case.
    pub fn find(name: &str) -> Option<&'static Template> {
        let wanted = name.trim().replace('_', "-");
        TEMPLATES.iter().find(|t| {
            t.key.eq_ignore_ascii_case(&wanted) || t.token_symbol.eq_ignore_ascii_case(&wanted)
        })
    }

    /// Menu entries are numbered from 1 in [`TEMPLATES`] order.
    pub fn from_menu_choice(choice: &str) -> Option<&'static Template> {
        let index: usize = choice.trim().parse().ok()?;
        TEMPLATES.get(index.checked_sub(1)?)
    }

    pub fn rate_percent(&self) -> f64 {
        f64::from(self.interest_rate_basis_points) / 100.0
    }
}

/// Per-deployment values that replace template fields, or supply every field
/// of a custom configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub token_name: Option<String>,
    pub token_symbol: Option<String>,
    pub decimals: Option<u8>,
    /// Whole tokens exactly as typed.
    pub initial_supply: Option<String>,
    /// Human percentage, `5` meaning 5% APY.
    pub rate_percent: Option<f64>,
    pub recipient: Option<String>,
    pub mint_authority: Option<String>,
    pub rate_authority: Option<String>,
}

/// Build a validated config from an optional template plus overrides.
///
/// Without a template, name, symbol and rate must be supplied; decimals and
/// supply fall back to [`DEFAULT_DECIMALS`] and [`DEFAULT_INITIAL_SUPPLY`].
pub fn resolve(template: Option<&Template>, overrides: ConfigOverrides) -> Result<DeploymentConfig> {
    let token_name = overrides
        .token_name
        .or_else(|| template.map(|t| t.token_name.to_string()))
        .ok_or_else(|| missing("token name"))?;
    let token_symbol = overrides
        .token_symbol
        .or_else(|| template.map(|t| t.token_symbol.to_string()))
        .ok_or_else(|| missing("token symbol"))?;
    let decimals = overrides
        .decimals
        .or_else(|| template.map(|t| t.decimals))
        .unwrap_or(DEFAULT_DECIMALS);
    let initial_supply: TokenAmount = match &overrides.initial_supply {
        Some(text) => text.parse()?,
        None => template
            .map_or(DEFAULT_INITIAL_SUPPLY, |t| t.initial_supply)
            .parse()?,
    };
    let interest_rate_basis_points = match overrides.rate_percent {
        Some(percent) => percent_to_basis_points(percent)?,
        None => template
            .map(|t| t.interest_rate_basis_points)
            .ok_or_else(|| missing("interest rate"))?,
    };

    let config = DeploymentConfig {
        token_name: token_name.trim().to_string(),
        token_symbol: token_symbol.trim().to_string(),
        decimals,
        initial_supply,
        interest_rate_basis_points,
        rate_authority: parse_optional_identity("rate authority", overrides.rate_authority)?,
        mint_authority: parse_optional_identity("mint authority", overrides.mint_authority)?,
        recipient: parse_optional_identity("recipient", overrides.recipient)?,
    };
    validate(&config)?;
    Ok(config)
}

fn validate(config: &DeploymentConfig) -> Result<()> {
    if config.token_name.is_empty() {
        return Err(missing("token name"));
    }
    validate_symbol(&config.token_symbol)?;
    if config.decimals > MAX_DECIMALS {
        return Err(DeployerError::Configuration(format!(
            "Decimals must be at most {MAX_DECIMALS}, got {}",
            config.decimals
        )));
    }
    raw_amount(&config.initial_supply, config.decimals)?;
    Ok(())
}

/// Symbols name the deployment record on disk, so only `[A-Za-z0-9_-]` is allowed.
pub fn validate_symbol(symbol: &str) -> Result<()> {
    if symbol.is_empty() {
        return Err(missing("token symbol"));
    }
    if let Some(bad) = symbol
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(DeployerError::Configuration(format!(
            "Token symbol {symbol:?} contains invalid character {bad:?}"
        )));
    }
    Ok(())
}

/// Convert a percentage to basis points, rounding half away from zero.
pub fn percent_to_basis_points(percent: f64) -> Result<i16> {
    if !percent.is_finite() {
        return Err(DeployerError::Configuration(format!(
            "Invalid interest rate: {percent}"
        )));
    }
    let basis_points = (percent * 100.0).round();
    if basis_points < f64::from(i16::MIN) || basis_points > f64::from(i16::MAX) {
        return Err(DeployerError::Configuration(format!(
            "Interest rate {percent}% is outside the supported range"
        )));
    }
    Ok(basis_points as i16)
}

/// Scale whole tokens to raw units (`supply * 10^decimals`) by shifting the
/// typed digits. Rejects amounts that would need truncation or overflow `u64`.
pub fn raw_amount(supply: &TokenAmount, decimals: u8) -> Result<u64> {
    if supply.is_zero() {
        return Ok(0);
    }

    let (whole, fraction) = (supply.whole(), supply.fraction());
    if fraction.len() > usize::from(decimals) {
        return Err(DeployerError::Configuration(format!(
            "Initial supply {supply} has more fractional digits than {decimals} decimals allow"
        )));
    }

    let digits = format!("{whole}{fraction:0<width$}", width = usize::from(decimals));
    digits.parse::<u64>().map_err(|_| {
        DeployerError::Configuration(format!(
            "Initial supply {supply} with {decimals} decimals exceeds the maximum raw amount {}",
            u64::MAX
        ))
    })
}

/// Parse a base58 ledger identity.
pub fn parse_identity(field: &str, value: &str) -> Result<Pubkey> {
    Pubkey::from_str(value.trim()).map_err(|_| {
        DeployerError::Configuration(format!("Invalid {field} public key: {value:?}"))
    })
}

fn parse_optional_identity(field: &str, value: Option<String>) -> Result<Option<Pubkey>> {
    value.map(|v| parse_identity(field, &v)).transpose()
}

fn missing(field: &str) -> DeployerError {
    DeployerError::Configuration(format!("Missing required {field}"))
}
