//! In-memory [`Ledger`] for unit tests.
//!
//! Decodes the Token-2022 instructions the deployer sends and keeps just
//! enough mint state to answer read-backs and enforce authorities.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_system_interface::program as system_program;
use spl_token_2022::instruction::TokenInstruction;
use tempfile::TempDir;

use crate::deployer::Deployer;
use crate::errors::{DeployerError, Result};
use crate::ledger::Ledger;
use crate::store::ResultStore;
use crate::types::{InterestBearingState, MintState};

/// Cluster clock reported for every interest-bearing initialisation.
pub const NOW: i64 = 1_700_000_000;

#[derive(Clone, Default)]
struct State {
    submissions: Vec<Vec<Instruction>>,
    accounts: HashSet<Pubkey>,
    mints: HashMap<Pubkey, MintState>,
    balance: u64,
    airdrops: usize,
    fail_airdrops: bool,
    fail_reads: bool,
    fail_submission: Option<usize>,
    associated_accounts_exist: bool,
}

#[derive(Default)]
pub struct MockLedger {
    state: Mutex<State>,
}

impl MockLedger {
    pub fn fail_reads(&self) {
        self.lock().fail_reads = true;
    }

    pub fn fail_airdrops(&self) {
        self.lock().fail_airdrops = true;
    }

    /// Reject the `index`-th submitted transaction (zero based).
    pub fn fail_submission(&self, index: usize) {
        self.lock().fail_submission = Some(index);
    }

    pub fn set_balance(&self, lamports: u64) {
        self.lock().balance = lamports;
    }

    pub fn assume_associated_accounts_exist(&self) {
        self.lock().associated_accounts_exist = true;
    }

    pub fn submissions(&self) -> Vec<Vec<Instruction>> {
        self.lock().submissions.clone()
    }

    pub fn mint_count(&self) -> usize {
        self.lock().mints.len()
    }

    pub fn current_rate(&self, mint: &Pubkey) -> Option<i16> {
        self.lock()
            .mints
            .get(mint)
            .and_then(|m| m.interest.as_ref())
            .map(|i| i.current_rate)
    }

    pub fn airdrop_count(&self) -> usize {
        self.lock().airdrops
    }

    pub fn balance_of(&self, _address: &Pubkey) -> u64 {
        self.lock().balance
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }
}

/// A deployer over `ledger` with a fresh payer, writing records to a temp dir.
pub fn deployer(ledger: MockLedger) -> (Deployer<MockLedger>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let deployer = Deployer::new(ledger, Keypair::new(), ResultStore::new(dir.path()));
    (deployer, dir)
}

impl Ledger for MockLedger {
    async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64> {
        Ok((128 + data_len as u64) * 6_960)
    }

    async fn submit_and_confirm(
        &self,
        instructions: &[Instruction],
        payer: &Keypair,
        signers: &[&Keypair],
    ) -> Result<Signature> {
        let mut state = self.lock();
        let index = state.submissions.len();
        state.submissions.push(instructions.to_vec());

        if state.fail_submission == Some(index) {
            return Err(DeployerError::Network(
                "Transaction simulation failed: blockhash not found".to_string(),
            ));
        }

        let mut signed: HashSet<Pubkey> = signers.iter().map(|k| k.pubkey()).collect();
        signed.insert(payer.pubkey());

        // All or nothing, like a real transaction.
        let mut next = state.clone();
        for instruction in instructions {
            apply(&mut next, instruction, &signed)?;
        }
        *state = next;

        Ok(Signature::new_unique())
    }

    async fn account_exists(&self, address: &Pubkey) -> Result<bool> {
        let state = self.lock();
        Ok(state.associated_accounts_exist || state.accounts.contains(address))
    }

    async fn read_mint_state(&self, mint: &Pubkey) -> Result<MintState> {
        let state = self.lock();
        if state.fail_reads {
            return Err(DeployerError::Network("getAccountInfo timed out".to_string()));
        }
        state
            .mints
            .get(mint)
            .cloned()
            .ok_or_else(|| DeployerError::Network(format!("AccountNotFound: {mint}")))
    }

    async fn balance(&self, _address: &Pubkey) -> Result<u64> {
        Ok(self.lock().balance)
    }

    async fn request_airdrop(&self, _address: &Pubkey, lamports: u64) -> Result<Signature> {
        let mut state = self.lock();
        if state.fail_airdrops {
            return Err(DeployerError::Faucet("429 Too Many Requests".to_string()));
        }
        state.balance += lamports;
        state.airdrops += 1;
        Ok(Signature::new_unique())
    }
}

fn apply(state: &mut State, ix: &Instruction, signed: &HashSet<Pubkey>) -> Result<()> {
    if ix.program_id == system_program::id() {
        let new_account = ix.accounts[1].pubkey;
        if !state.accounts.insert(new_account) {
            return Err(DeployerError::Network(format!(
                "Account {new_account} already in use"
            )));
        }
        return Ok(());
    }

    if ix.program_id == spl_associated_token_account::id() {
        state.accounts.insert(ix.accounts[1].pubkey);
        return Ok(());
    }

    if ix.program_id != spl_token_2022::id() {
        return Err(DeployerError::Network(format!(
            "Unsupported program {}",
            ix.program_id
        )));
    }

    let mint = ix.accounts[0].pubkey;
    let instruction =
        TokenInstruction::unpack(&ix.data).map_err(|e| DeployerError::Network(e.to_string()))?;

    match instruction {
        TokenInstruction::InterestBearingMintExtension => {
            let len = ix.data.len();
            let rate = i16::from_le_bytes([ix.data[len - 2], ix.data[len - 1]]);
            match ix.data[1] {
                0 => {
                    let authority = Pubkey::try_from(&ix.data[2..34]).unwrap();
                    state.mints.entry(mint).or_insert_with(empty_mint).interest =
                        Some(InterestBearingState {
                            rate_authority: (authority != Pubkey::default()).then_some(authority),
                            current_rate: rate,
                            last_update_timestamp: NOW,
                        });
                }
                _ => {
                    let interest = state
                        .mints
                        .get_mut(&mint)
                        .and_then(|m| m.interest.as_mut())
                        .ok_or_else(|| DeployerError::Network(format!("Invalid mint {mint}")))?;
                    let signer = ix.accounts[1].pubkey;
                    if interest.rate_authority != Some(signer) || !signed.contains(&signer) {
                        return Err(DeployerError::Authorization(
                            "owner does not match".to_string(),
                        ));
                    }
                    interest.current_rate = rate;
                    interest.last_update_timestamp = NOW + 1;
                }
            }
        }
        TokenInstruction::InitializeMint {
            decimals,
            mint_authority,
            ..
        } => {
            if !state.accounts.contains(&mint) {
                return Err(DeployerError::Network(format!("Mint {mint} not created")));
            }
            let entry = state.mints.entry(mint).or_insert_with(empty_mint);
            entry.decimals = decimals;
            entry.mint_authority = Some(mint_authority);
        }
        TokenInstruction::MintTo { amount } => {
            let destination = ix.accounts[1].pubkey;
            let owner = ix.accounts[2].pubkey;
            if !(state.associated_accounts_exist || state.accounts.contains(&destination)) {
                return Err(DeployerError::Network(format!(
                    "Destination {destination} does not exist"
                )));
            }
            let mint_state = state
                .mints
                .get_mut(&mint)
                .ok_or_else(|| DeployerError::Network(format!("Invalid mint {mint}")))?;
            if mint_state.mint_authority != Some(owner) || !signed.contains(&owner) {
                return Err(DeployerError::Authorization(
                    "owner does not match".to_string(),
                ));
            }
            mint_state.supply += amount;
        }
        other => {
            return Err(DeployerError::Network(format!(
                "Unsupported instruction {other:?}"
            )))
        }
    }
    Ok(())
}

fn empty_mint() -> MintState {
    MintState {
        decimals: 0,
        supply: 0,
        mint_authority: None,
        interest: None,
    }
}
