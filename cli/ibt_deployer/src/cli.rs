//! Command-line surface.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use clap::{Args, Parser};

use crate::config::Config;
use crate::deployer::Deployer;
use crate::errors::{DeployerError, Result};
use crate::funding::sol;
use crate::interactive::{self, print_result};
use crate::ledger::Ledger;
use crate::prompt::Prompter;
use crate::rpc::load_keypair;
use crate::store::ResultStore;
use crate::templates::{self, parse_identity, percent_to_basis_points, ConfigOverrides, Template};

#[derive(Debug, Parser)]
#[command(
    name = "ibt-deployer",
    version,
    about = "Deploy interest-bearing Token-2022 stablecoins to Solana"
)]
pub struct Arguments {
    #[command(subcommand)]
    pub subcommand: Option<Subcommand>,
}

#[derive(Debug, clap::Subcommand)]
pub enum Subcommand {
    /// Choose a template or custom values step by step (default)
    Interactive,
    /// Deploy without prompting
    Deploy(Deploy),
    /// Change the interest rate of an existing mint
    UpdateRate(UpdateRate),
    /// Top up the deployer wallet from the faucet if it is below a minimum
    Airdrop(Airdrop),
    /// Show stored deployment records
    List,
}

#[derive(Debug, Args)]
pub struct Deploy {
    /// Template key or symbol: usdc, usdt, dai
    #[arg(long)]
    template: Option<String>,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    symbol: Option<String>,
    #[arg(long)]
    decimals: Option<u8>,
    /// Initial supply in whole tokens
    #[arg(long)]
    supply: Option<String>,
    /// Interest rate in percent APY, negative for decay
    #[arg(long, allow_hyphen_values = true)]
    rate: Option<f64>,
    #[arg(long)]
    recipient: Option<String>,
    #[arg(long)]
    mint_authority: Option<String>,
    #[arg(long)]
    rate_authority: Option<String>,
    /// Request a faucet airdrop first if the wallet is below AIRDROP_LAMPORTS
    #[arg(long)]
    airdrop: bool,
}

#[derive(Debug, Args)]
pub struct UpdateRate {
    #[arg(long)]
    mint: String,
    /// New rate in percent APY
    #[arg(long, allow_hyphen_values = true)]
    rate: f64,
    /// Keypair file of the rate authority, defaults to the deployer wallet
    #[arg(long)]
    authority: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct Airdrop {
    /// Minimum balance to hold, defaults to AIRDROP_LAMPORTS
    #[arg(long)]
    lamports: Option<u64>,
}

impl Deploy {
    fn template(&self) -> Result<Option<&'static Template>> {
        self.template
            .as_deref()
            .map(|name| {
                Template::find(name).ok_or_else(|| {
                    DeployerError::Configuration(format!("Unknown template {name:?}"))
                })
            })
            .transpose()
    }

    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            token_name: self.name.clone(),
            token_symbol: self.symbol.clone(),
            decimals: self.decimals,
            initial_supply: self.supply.clone(),
            rate_percent: self.rate,
            recipient: self.recipient.clone(),
            mint_authority: self.mint_authority.clone(),
            rate_authority: self.rate_authority.clone(),
        }
    }
}

impl Subcommand {
    pub async fn run<L: Ledger, R: BufRead, W: Write>(
        self,
        prompter: &mut Prompter<R, W>,
        deployer: &Deployer<L>,
        config: &Config,
    ) -> Result<()> {
        match self {
            Self::Interactive => interactive::run(prompter, deployer, config).await,
            Self::Deploy(deploy) => {
                let token = templates::resolve(deploy.template()?, deploy.overrides())?;
                if deploy.airdrop {
                    deployer.ensure_funds(config.airdrop_lamports).await?;
                }
                let result = deployer.deploy(&token).await?;
                print_result(prompter, &result, config)
            }
            Self::UpdateRate(update) => {
                let mint = parse_identity("mint", &update.mint)?;
                let rate = percent_to_basis_points(update.rate)?;
                let authority = update.authority.as_deref().map(load_keypair).transpose()?;
                let signature = deployer.update_rate(&mint, rate, authority.as_ref()).await?;
                prompter.say(format!(
                    "Interest rate updated to {}%: {}",
                    update.rate,
                    config.explorer_tx_url(&signature.to_string())
                ))
            }
            Self::Airdrop(airdrop) => {
                let minimum = airdrop.lamports.unwrap_or(config.airdrop_lamports);
                match deployer.ensure_funds(minimum).await? {
                    Some(signature) => prompter.say(format!(
                        "Airdrop confirmed: {}",
                        config.explorer_tx_url(&signature.to_string())
                    )),
                    None => prompter.say(format!(
                        "No airdrop performed (minimum {} SOL)",
                        sol(minimum)
                    )),
                }
            }
            Self::List => list(deployer.store(), prompter),
        }
    }
}

/// Print one line per stored deployment, oldest file name first.
pub fn list<R: BufRead, W: Write>(store: &ResultStore, prompter: &mut Prompter<R, W>) -> Result<()> {
    let records = store.list()?;
    if records.is_empty() {
        return prompter.say(format!("No deployments in {}", store.dir().display()));
    }
    for (path, record) in records {
        prompter.say(format!(
            "{}  {}  {}  {} bp  supply {}  ({})",
            record.deployment_time.to_rfc3339(),
            record.config.token_symbol,
            record.mint_address,
            record.config.interest_rate_basis_points,
            record.config.total_supply,
            path.display()
        ))?;
    }
    Ok(())
}
