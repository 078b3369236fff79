//! Balance-aware faucet request for the deployer wallet.

use solana_sdk::native_token::LAMPORTS_PER_SOL;
use solana_sdk::signature::{Signature, Signer};
use tracing::{info, warn};

use crate::deployer::Deployer;
use crate::errors::Result;
use crate::ledger::Ledger;

impl<L: Ledger> Deployer<L> {
    /// Airdrop `minimum_lamports` unless the deployer already holds that much.
    ///
    /// Returns `None` when no airdrop was needed or when the faucet failed; a
    /// faucet failure is only logged, the deployment can still try with the
    /// current balance.
    pub async fn ensure_funds(&self, minimum_lamports: u64) -> Result<Option<Signature>> {
        let payer = self.payer.pubkey();
        let balance = self.ledger.balance(&payer).await?;
        info!("Current balance: {:.4} SOL", sol(balance));

        if balance >= minimum_lamports {
            info!(
                "Sufficient SOL balance ({:.4} SOL), skipping airdrop",
                sol(balance)
            );
            return Ok(None);
        }

        info!("Requesting {} SOL airdrop", sol(minimum_lamports));
        match self.ledger.request_airdrop(&payer, minimum_lamports).await {
            Ok(signature) => {
                match self.ledger.balance(&payer).await {
                    Ok(balance) => info!(
                        "Airdrop completed: {signature} (new balance: {:.4} SOL)",
                        sol(balance)
                    ),
                    Err(e) => info!("Airdrop completed: {signature} (balance unavailable: {e})"),
                }
                Ok(Some(signature))
            }
            Err(e) => {
                warn!("Airdrop failed ({e}), continuing with existing balance");
                Ok(None)
            }
        }
    }
}

pub fn sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}
