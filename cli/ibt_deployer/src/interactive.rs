//! The interactive deployment session: configure, confirm, fund, deploy,
//! optionally change the rate.

use std::io::{BufRead, Write};

use crate::config::Config;
use crate::deployer::Deployer;
use crate::errors::Result;
use crate::ledger::Ledger;
use crate::prompt::{collect_config, Prompter};
use crate::templates::{parse_identity, percent_to_basis_points};
use crate::types::{DeploymentConfig, DeploymentResult};

const RULE: &str = "--------------------------------------------";

pub async fn run<L: Ledger, R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    deployer: &Deployer<L>,
    config: &Config,
) -> Result<()> {
    prompter.say("Yield-Bearing Stablecoin Deployer")?;
    prompter.say(format!("Target network: Solana {}", config.cluster))?;
    prompter.say(RULE)?;

    let token = collect_config(prompter)?;
    print_summary(prompter, &token)?;

    if !prompter.confirm("\nProceed with deployment? (y/n): ", false)? {
        prompter.say("Deployment cancelled")?;
        return Ok(());
    }

    prompter.say(format!("\nDeployer public key: {}", deployer.payer_pubkey()))?;
    if prompter.confirm("Request SOL airdrop for deployment? (y/n) [default: y]: ", true)? {
        deployer.ensure_funds(config.airdrop_lamports).await?;
    }

    prompter.say("\nStarting deployment...")?;
    let result = deployer.deploy(&token).await?;
    print_result(prompter, &result, config)?;

    if prompter.confirm("\nWould you like to update the interest rate? (y/n): ", false)? {
        let answer = prompter.ask("New interest rate (% APY): ")?;
        match answer.parse::<f64>() {
            Ok(percent) => {
                let rate = percent_to_basis_points(percent)?;
                let mint = parse_identity("mint", &result.mint_address)?;
                prompter.say(format!("\nUpdating interest rate to {percent}%..."))?;
                let signature = deployer.update_rate(&mint, rate, None).await?;
                prompter.say(format!(
                    "Rate updated: {}",
                    config.explorer_tx_url(&signature.to_string())
                ))?;
            }
            Err(_) => prompter.say(format!("{answer:?} is not a number, keeping the current rate"))?,
        }
    }

    prompter.say("\nDeployment completed successfully!")?;
    prompter.say(format!(
        "Deployment details have been saved to {}",
        deployer.store().dir().display()
    ))?;
    Ok(())
}

fn print_summary<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    token: &DeploymentConfig,
) -> Result<()> {
    prompter.say("\nDeployment configuration:")?;
    prompter.say(format!("   Token: {} ({})", token.token_name, token.token_symbol))?;
    prompter.say(format!("   Decimals: {}", token.decimals))?;
    prompter.say(format!("   Initial Supply: {} tokens", token.initial_supply))?;
    prompter.say(format!(
        "   Interest Rate: {}% APY",
        f64::from(token.interest_rate_basis_points) / 100.0
    ))?;
    match &token.recipient {
        Some(recipient) => prompter.say(format!("   Recipient: {recipient}")),
        None => prompter.say("   Recipient: Deployer wallet"),
    }
}

/// Mint address, explorer links and signatures of a finished deployment.
pub fn print_result<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    result: &DeploymentResult,
    config: &Config,
) -> Result<()> {
    prompter.say("\nDeployment successful!")?;
    prompter.say(RULE)?;
    prompter.say(format!("Mint Address: {}", result.mint_address))?;
    prompter.say(format!(
        "Solana Explorer: {}",
        config.explorer_address_url(&result.mint_address)
    ))?;
    prompter.say(format!(
        "Interest Rate: {}% APY",
        f64::from(result.config.interest_rate_basis_points) / 100.0
    ))?;
    prompter.say("Transaction Signatures:")?;
    for (i, signature) in result.transaction_signatures.iter().enumerate() {
        prompter.say(format!("   {}. {}", i + 1, config.explorer_tx_url(signature)))?;
    }
    Ok(())
}
