//! Interest-bearing stablecoin deployer entry point.
//!
//! Deploys Token-2022 mints carrying the interest-bearing extension to a
//! Solana cluster (devnet by default), optionally mints an initial supply,
//! and records every deployment as JSON under the deployments directory.

mod cli;
mod config;
mod deployer;
mod errors;
mod funding;
mod interactive;
mod ledger;
#[cfg(test)]
mod mock;
mod prompt;
mod rate;
mod rpc;
mod store;
mod templates;
mod types;

use std::io;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::{Arguments, Subcommand};
use config::Config;
use deployer::Deployer;
use prompt::Prompter;
use rpc::RpcLedger;
use store::ResultStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ibt_deployer=info")),
        )
        .with_writer(io::stderr)
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    let arguments = Arguments::parse();
    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;
    let store = ResultStore::new(&config.deployments_dir);
    let mut prompter = Prompter::new(io::stdin().lock(), io::stdout());

    let subcommand = arguments.subcommand.unwrap_or(Subcommand::Interactive);

    // Listing records needs no wallet.
    if let Subcommand::List = subcommand {
        return cli::list(&store, &mut prompter).map_err(|e| anyhow::anyhow!("{e}"));
    }

    let payer = rpc::load_keypair(&config.keypair_path).map_err(|e| anyhow::anyhow!("{e}"))?;
    let deployer = Deployer::new(RpcLedger::new(&config), payer, store);
    info!(
        "Using {} as deployer on {}",
        deployer.payer_pubkey(),
        config.rpc_url
    );

    subcommand
        .run(&mut prompter, &deployer, &config)
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))
}
