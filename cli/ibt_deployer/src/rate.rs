//! Interest rate changes on an already deployed mint.

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use spl_token_2022::extension::interest_bearing_mint;
use tracing::info;

use crate::deployer::{instruction_error, Deployer};
use crate::errors::Result;
use crate::ledger::Ledger;

impl<L: Ledger> Deployer<L> {
    /// Set a new rate on `mint`, signed by `authority` (the deployer when `None`).
    ///
    /// A signer that is not the mint's rate authority comes back as
    /// [`crate::errors::DeployerError::Authorization`]. Stored deployment
    /// records are left untouched.
    pub async fn update_rate(
        &self,
        mint: &Pubkey,
        rate_basis_points: i16,
        authority: Option<&Keypair>,
    ) -> Result<Signature> {
        let authority = authority.unwrap_or(&self.payer);

        let instruction = interest_bearing_mint::instruction::update_rate(
            &spl_token_2022::id(),
            mint,
            &authority.pubkey(),
            &[],
            rate_basis_points,
        )
        .map_err(instruction_error)?;

        let signature = self
            .ledger
            .submit_and_confirm(&[instruction], &self.payer, &[authority])
            .await?;

        info!(
            "Interest rate on {mint} updated to {}% ({signature})",
            f64::from(rate_basis_points) / 100.0
        );
        Ok(signature)
    }
}
