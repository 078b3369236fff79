//! Solana JSON-RPC implementation of [`Ledger`].
//!
//! ## Error mapping
//!
//! * Token-2022 `OwnerMismatch` and missing signatures surface as
//!   [`DeployerError::Authorization`].
//! * Faucet failures surface as [`DeployerError::Faucet`].
//! * Everything else the client reports is a [`DeployerError::Network`].
//!
//! Nothing here retries; the node's preflight and confirmation behaviour is used as is.

use std::path::Path;
use std::time::Duration;

use solana_client::client_error::ClientError;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_commitment_config::CommitmentConfig;
use solana_sdk::instruction::{Instruction, InstructionError};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{read_keypair_file, Keypair, Signature, Signer};
use solana_sdk::transaction::{Transaction, TransactionError};
use spl_token_2022::error::TokenError;
use spl_token_2022::extension::interest_bearing_mint::InterestBearingConfig;
use spl_token_2022::extension::{BaseStateWithExtensions, StateWithExtensions};
use spl_token_2022::solana_program::program_option::COption;
use spl_token_2022::state::Mint;
use tracing::debug;

use crate::config::Config;
use crate::errors::{DeployerError, Result};
use crate::ledger::Ledger;
use crate::types::{InterestBearingState, MintState};

pub struct RpcLedger {
    client: RpcClient,
}

impl RpcLedger {
    pub fn new(config: &Config) -> Self {
        let client = RpcClient::new_with_timeout_and_commitment(
            config.rpc_url.clone(),
            Duration::from_secs(config.rpc_timeout_secs),
            CommitmentConfig::confirmed(),
        );
        Self { client }
    }
}

impl Ledger for RpcLedger {
    async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64> {
        self.client
            .get_minimum_balance_for_rent_exemption(data_len)
            .await
            .map_err(classify)
    }

    async fn submit_and_confirm(
        &self,
        instructions: &[Instruction],
        payer: &Keypair,
        signers: &[&Keypair],
    ) -> Result<Signature> {
        let blockhash = self.client.get_latest_blockhash().await.map_err(classify)?;

        let mut keypairs: Vec<&Keypair> = vec![payer];
        for signer in signers {
            if !keypairs.iter().any(|k| k.pubkey() == signer.pubkey()) {
                keypairs.push(*signer);
            }
        }

        let mut transaction = Transaction::new_with_payer(instructions, Some(&payer.pubkey()));
        transaction
            .try_sign(keypairs.as_slice(), blockhash)
            .map_err(|e| DeployerError::Authorization(format!("Signing failed: {e}")))?;

        let signature = self
            .client
            .send_and_confirm_transaction(&transaction)
            .await
            .map_err(classify)?;

        debug!(
            "Confirmed {} instruction(s) in {signature}",
            instructions.len()
        );
        Ok(signature)
    }

    async fn account_exists(&self, address: &Pubkey) -> Result<bool> {
        let response = self
            .client
            .get_account_with_commitment(address, self.client.commitment())
            .await
            .map_err(classify)?;
        Ok(response.value.is_some())
    }

    async fn read_mint_state(&self, mint: &Pubkey) -> Result<MintState> {
        let account = self.client.get_account(mint).await.map_err(classify)?;
        decode_mint_state(&account.data)
    }

    async fn balance(&self, address: &Pubkey) -> Result<u64> {
        self.client.get_balance(address).await.map_err(classify)
    }

    async fn request_airdrop(&self, address: &Pubkey, lamports: u64) -> Result<Signature> {
        let signature = self
            .client
            .request_airdrop(address, lamports)
            .await
            .map_err(|e| DeployerError::Faucet(e.to_string()))?;

        self.client
            .poll_for_signature(&signature)
            .await
            .map_err(|e| DeployerError::Faucet(format!("Airdrop {signature} not confirmed: {e}")))?;

        Ok(signature)
    }
}

// ─────────────────────────────────────────────────────────
// Keypair loading
// ─────────────────────────────────────────────────────────

/// Load the deployer keypair from a Solana CLI JSON keypair file.
pub fn load_keypair(path: &Path) -> Result<Keypair> {
    if !path.exists() {
        return Err(DeployerError::Configuration(format!(
            "CLI wallet not found at {}. Run 'solana-keygen new' first.",
            path.display()
        )));
    }
    read_keypair_file(path).map_err(|e| {
        DeployerError::Configuration(format!("Invalid keypair file {}: {e}", path.display()))
    })
}

// ─────────────────────────────────────────────────────────
// Account decoding
// ─────────────────────────────────────────────────────────

/// Decode raw mint account data, including the interest-bearing extension when present.
pub fn decode_mint_state(data: &[u8]) -> Result<MintState> {
    let state = StateWithExtensions::<Mint>::unpack(data)
        .map_err(|e| DeployerError::Network(format!("Account is not a Token-2022 mint: {e}")))?;

    let interest = state
        .get_extension::<InterestBearingConfig>()
        .ok()
        .map(|config| InterestBearingState {
            rate_authority: Option::<Pubkey>::from(config.rate_authority),
            current_rate: i16::from(config.current_rate),
            last_update_timestamp: i64::from(config.last_update_timestamp),
        });

    let mint_authority = match state.base.mint_authority {
        COption::Some(authority) => Some(authority),
        COption::None => None,
    };

    Ok(MintState {
        decimals: state.base.decimals,
        supply: state.base.supply,
        mint_authority,
        interest,
    })
}

fn classify(err: ClientError) -> DeployerError {
    if let Some(TransactionError::InstructionError(index, ix_err)) = err.get_transaction_error() {
        let unauthorized = match &ix_err {
            InstructionError::MissingRequiredSignature => true,
            InstructionError::Custom(code) => *code == TokenError::OwnerMismatch as u32,
            _ => false,
        };
        if unauthorized {
            return DeployerError::Authorization(format!(
                "Instruction {index} rejected: {ix_err}"
            ));
        }
    }
    DeployerError::Network(err.to_string())
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
