//! Boundary between the deployment workflow and the Solana cluster.
//!
//! The orchestrator builds instructions with the SDK crates and hands them to a
//! [`Ledger`] for signing and submission; it never talks to the RPC node
//! directly. [`crate::rpc::RpcLedger`] is the production implementation.

use std::future::Future;

use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature};

use crate::errors::Result;
use crate::types::MintState;

/// Async access to the cluster used by every deployment step.
pub trait Ledger: Send + Sync {
    /// Lamports required for an account of `data_len` bytes to be rent exempt.
    fn minimum_balance_for_rent_exemption(
        &self,
        data_len: usize,
    ) -> impl Future<Output = Result<u64>> + Send;

    /// Sign `instructions` as one transaction paid by `payer` and wait for
    /// confirmation. `signers` are added to the payer's signature.
    fn submit_and_confirm(
        &self,
        instructions: &[Instruction],
        payer: &Keypair,
        signers: &[&Keypair],
    ) -> impl Future<Output = Result<Signature>> + Send;

    fn account_exists(&self, address: &Pubkey) -> impl Future<Output = Result<bool>> + Send;

    /// Fetch and decode a Token-2022 mint, including its interest-bearing extension.
    fn read_mint_state(&self, mint: &Pubkey) -> impl Future<Output = Result<MintState>> + Send;

    fn balance(&self, address: &Pubkey) -> impl Future<Output = Result<u64>> + Send;

    /// Ask the cluster faucet for `lamports` and wait until the airdrop lands.
    fn request_airdrop(
        &self,
        address: &Pubkey,
        lamports: u64,
    ) -> impl Future<Output = Result<Signature>> + Send;
}
