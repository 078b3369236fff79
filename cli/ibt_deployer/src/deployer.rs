//! Deployment orchestration: mint creation, initial supply, read-back, record.
//!
//! Every step is awaited before the next one starts. A failure after the mint
//! creation transaction leaves the mint on chain; nothing is rolled back or
//! resumed, a rerun deploys a fresh mint.

use chrono::Utc;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_system_interface::instruction as system_instruction;
use spl_associated_token_account::get_associated_token_address_with_program_id;
use spl_associated_token_account::instruction::create_associated_token_account;
use spl_token_2022::extension::interest_bearing_mint;
use spl_token_2022::extension::ExtensionType;
use spl_token_2022::solana_program::program_error::ProgramError;
use spl_token_2022::state::Mint;
use tracing::{error, info, warn};

use crate::errors::{DeployerError, Result};
use crate::ledger::Ledger;
use crate::store::ResultStore;
use crate::templates::raw_amount;
use crate::types::{DeploymentConfig, DeploymentResult, EffectiveConfig, MintState};

/// Deployment context: the cluster adapter, the deployer's keypair, and where
/// records go. The keypair pays for and, by default, administers every mint.
pub struct Deployer<L> {
    pub(crate) ledger: L,
    pub(crate) payer: Keypair,
    store: ResultStore,
}

impl<L: Ledger> Deployer<L> {
    pub fn new(ledger: L, payer: Keypair, store: ResultStore) -> Self {
        Self {
            ledger,
            payer,
            store,
        }
    }

    pub fn payer_pubkey(&self) -> Pubkey {
        self.payer.pubkey()
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    /// Deploy an interest-bearing mint described by `config`, mint its initial
    /// supply, and persist the resulting record.
    pub async fn deploy(&self, config: &DeploymentConfig) -> Result<DeploymentResult> {
        let result = self.run_deployment(config).await;
        if let Err(e) = &result {
            error!("Deployment of {} failed: {e}", config.token_symbol);
        }
        result
    }

    async fn run_deployment(&self, config: &DeploymentConfig) -> Result<DeploymentResult> {
        let payer = self.payer.pubkey();
        let mint_authority = config.mint_authority.unwrap_or(payer);
        let rate_authority = config.rate_authority.unwrap_or(payer);

        let raw_supply = raw_amount(&config.initial_supply, config.decimals)?;
        if raw_supply > 0 && mint_authority != payer {
            return Err(DeployerError::Configuration(format!(
                "Minting an initial supply needs the mint authority's signature; \
                 {mint_authority} is not the deployer wallet {payer}"
            )));
        }

        info!(
            "Deploying {} ({}) with {} decimals at {} bp",
            config.token_name,
            config.token_symbol,
            config.decimals,
            config.interest_rate_basis_points
        );

        let mut signatures = Vec::new();
        let mint = Keypair::new();
        let mint_pubkey = mint.pubkey();

        let signature = self
            .create_interest_bearing_mint(
                &mint,
                config.decimals,
                &mint_authority,
                &rate_authority,
                config.interest_rate_basis_points,
            )
            .await?;
        signatures.push(signature.to_string());
        info!("Mint created: {mint_pubkey} ({signature})");

        if raw_supply > 0 {
            let recipient = config.recipient.unwrap_or(payer);
            info!(
                "Minting {} tokens ({raw_supply} raw) to {recipient}",
                config.initial_supply
            );
            let signature = self
                .mint_initial_supply(&mint_pubkey, &recipient, raw_supply)
                .await?;
            signatures.push(signature.to_string());
            info!("Minted {} tokens ({signature})", config.initial_supply);
        }

        let on_chain = match self.ledger.read_mint_state(&mint_pubkey).await {
            Ok(state) => Some(state),
            Err(e) => {
                warn!("Could not read back mint {mint_pubkey}, recording requested values: {e}");
                None
            }
        };

        let result = DeploymentResult {
            mint_address: mint_pubkey.to_string(),
            transaction_signatures: signatures,
            config: effective_config(
                config,
                &mint_authority,
                &rate_authority,
                raw_supply,
                on_chain.as_ref(),
            ),
            deployment_time: Utc::now(),
        };

        self.store.persist(&result)?;

        info!(
            "Deployment completed: {} at {}% APY",
            result.mint_address,
            f64::from(result.config.interest_rate_basis_points) / 100.0
        );
        Ok(result)
    }

    /// Create account, attach the interest-bearing extension, then initialize
    /// the mint, in one transaction. The extension must precede the mint init.
    async fn create_interest_bearing_mint(
        &self,
        mint: &Keypair,
        decimals: u8,
        mint_authority: &Pubkey,
        rate_authority: &Pubkey,
        rate_basis_points: i16,
    ) -> Result<Signature> {
        let token_program = spl_token_2022::id();
        let space = ExtensionType::try_calculate_account_len::<Mint>(&[
            ExtensionType::InterestBearingConfig,
        ])
        .map_err(instruction_error)?;
        let lamports = self.ledger.minimum_balance_for_rent_exemption(space).await?;

        let instructions = [
            system_instruction::create_account(
                &self.payer.pubkey(),
                &mint.pubkey(),
                lamports,
                space as u64,
                &token_program,
            ),
            interest_bearing_mint::instruction::initialize(
                &token_program,
                &mint.pubkey(),
                Some(*rate_authority),
                rate_basis_points,
            )
            .map_err(instruction_error)?,
            spl_token_2022::instruction::initialize_mint(
                &token_program,
                &mint.pubkey(),
                mint_authority,
                None,
                decimals,
            )
            .map_err(instruction_error)?,
        ];

        self.ledger
            .submit_and_confirm(&instructions, &self.payer, &[mint])
            .await
    }

    /// Make sure the recipient's associated account exists, then mint into it.
    /// Only the mint-to signature is returned.
    async fn mint_initial_supply(
        &self,
        mint: &Pubkey,
        recipient: &Pubkey,
        raw_amount: u64,
    ) -> Result<Signature> {
        let token_program = spl_token_2022::id();
        let payer = self.payer.pubkey();
        let account = get_associated_token_address_with_program_id(recipient, mint, &token_program);

        if !self.ledger.account_exists(&account).await? {
            let create =
                create_associated_token_account(&payer, recipient, mint, &token_program);
            let signature = self
                .ledger
                .submit_and_confirm(&[create], &self.payer, &[])
                .await?;
            info!("Created associated token account {account} ({signature})");
        }

        let mint_to = spl_token_2022::instruction::mint_to(
            &token_program,
            mint,
            &account,
            &payer,
            &[],
            raw_amount,
        )
        .map_err(instruction_error)?;

        self.ledger
            .submit_and_confirm(&[mint_to], &self.payer, &[])
            .await
    }
}

/// Echo what was applied. Values read back from chain win; without a
/// read-back the requested rate, expected supply and current time are used.
fn effective_config(
    config: &DeploymentConfig,
    mint_authority: &Pubkey,
    rate_authority: &Pubkey,
    raw_supply: u64,
    on_chain: Option<&MintState>,
) -> EffectiveConfig {
    let interest = on_chain.and_then(|state| state.interest.as_ref());

    EffectiveConfig {
        token_name: config.token_name.clone(),
        token_symbol: config.token_symbol.clone(),
        decimals: config.decimals,
        mint_authority: mint_authority.to_string(),
        rate_authority: rate_authority.to_string(),
        interest_rate_basis_points: interest
            .map(|i| i.current_rate)
            .unwrap_or(config.interest_rate_basis_points),
        initial_supply: config.initial_supply.approximate(),
        total_supply: on_chain
            .map(|state| state.supply)
            .unwrap_or(raw_supply)
            .to_string(),
        last_update_timestamp: interest
            .map(|i| i.last_update_timestamp)
            .unwrap_or_else(|| Utc::now().timestamp()),
    }
}

pub(crate) fn instruction_error(e: ProgramError) -> DeployerError {
    DeployerError::Configuration(format!("Cannot build instruction: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{self, MockLedger};
    use crate::templates::{resolve, ConfigOverrides, Template};
    use solana_system_interface::program as system_program;
    use spl_token_2022::instruction::TokenInstruction;

    fn usdc_config() -> DeploymentConfig {
        resolve(Template::find("usdc"), ConfigOverrides::default()).unwrap()
    }

    fn with_supply(supply: &str) -> DeploymentConfig {
        DeploymentConfig {
            initial_supply: supply.parse().unwrap(),
            ..usdc_config()
        }
    }

    #[tokio::test]
    async fn usdc_scenario_records_both_signatures_and_confirmed_state() {
        let (deployer, dir) = mock::deployer(MockLedger::default());
        let payer = deployer.payer_pubkey().to_string();

        let result = deployer.deploy(&usdc_config()).await.unwrap();

        assert_eq!(result.transaction_signatures.len(), 2);
        assert_eq!(result.config.mint_authority, payer);
        assert_eq!(result.config.rate_authority, payer);
        assert_eq!(result.config.interest_rate_basis_points, 500);
        assert_eq!(result.config.total_supply, "1000000000000");
        assert_eq!(result.config.last_update_timestamp, mock::NOW);
        assert_eq!(result.config.token_symbol, "USDC-TEST");

        let stored = ResultStore::new(dir.path()).list().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].1, result);
    }

    #[tokio::test]
    async fn creation_transaction_orders_extension_before_mint_init() {
        let (deployer, _dir) = mock::deployer(MockLedger::default());
        deployer.deploy(&with_supply("0")).await.unwrap();

        let submissions = deployer.ledger.submissions();
        let create = &submissions[0];
        assert_eq!(create.len(), 3);
        assert_eq!(create[0].program_id, system_program::id());
        assert!(matches!(
            TokenInstruction::unpack(&create[1].data).unwrap(),
            TokenInstruction::InterestBearingMintExtension
        ));
        match TokenInstruction::unpack(&create[2].data).unwrap() {
            TokenInstruction::InitializeMint {
                decimals,
                freeze_authority,
                ..
            } => {
                assert_eq!(decimals, 6);
                assert!(freeze_authority.is_none());
            }
            other => panic!("unexpected instruction {other:?}"),
        }
    }

    #[tokio::test]
    async fn zero_supply_records_single_signature() {
        let (deployer, _dir) = mock::deployer(MockLedger::default());

        let result = deployer.deploy(&with_supply("0")).await.unwrap();

        assert_eq!(result.transaction_signatures.len(), 1);
        assert_eq!(result.config.total_supply, "0");
        assert_eq!(deployer.ledger.submissions().len(), 1);
    }

    #[tokio::test]
    async fn missing_associated_account_is_created_but_not_recorded() {
        let (deployer, _dir) = mock::deployer(MockLedger::default());

        let result = deployer.deploy(&with_supply("1000")).await.unwrap();

        assert_eq!(deployer.ledger.submissions().len(), 3);
        assert_eq!(result.transaction_signatures.len(), 2);
        assert_eq!(result.config.total_supply, "1000000000");
    }

    #[tokio::test]
    async fn supply_beyond_f64_precision_is_minted_exactly() {
        let (deployer, _dir) = mock::deployer(MockLedger::default());
        let config = DeploymentConfig {
            decimals: 18,
            ..with_supply("1.000000000000000001")
        };

        let result = deployer.deploy(&config).await.unwrap();

        let submissions = deployer.ledger.submissions();
        match TokenInstruction::unpack(&submissions[2][0].data).unwrap() {
            TokenInstruction::MintTo { amount } => assert_eq!(amount, 1_000_000_000_000_000_001),
            other => panic!("unexpected instruction {other:?}"),
        }
        assert_eq!(result.config.total_supply, "1000000000000000001");
    }

    #[tokio::test]
    async fn existing_associated_account_is_reused() {
        let recipient = Pubkey::new_unique();
        let ledger = MockLedger::default();
        // Every mint derives a different account, so pre-create whatever gets asked for.
        ledger.assume_associated_accounts_exist();
        let (deployer, _dir) = mock::deployer(ledger);

        let config = DeploymentConfig {
            recipient: Some(recipient),
            ..with_supply("5")
        };
        let result = deployer.deploy(&config).await.unwrap();

        assert_eq!(deployer.ledger.submissions().len(), 2);
        assert_eq!(result.transaction_signatures.len(), 2);
        assert_eq!(result.config.total_supply, "5000000");
    }

    #[tokio::test]
    async fn supply_goes_to_recipient_associated_account() {
        let recipient = Pubkey::new_unique();
        let (deployer, _dir) = mock::deployer(MockLedger::default());
        let config = DeploymentConfig {
            recipient: Some(recipient),
            ..with_supply("1")
        };

        let result = deployer.deploy(&config).await.unwrap();

        let mint: Pubkey = result.mint_address.parse().unwrap();
        let expected =
            get_associated_token_address_with_program_id(&recipient, &mint, &spl_token_2022::id());
        let submissions = deployer.ledger.submissions();
        let mint_to = &submissions[2][0];
        assert_eq!(mint_to.accounts[1].pubkey, expected);
    }

    #[tokio::test]
    async fn explicit_rate_authority_is_echoed() {
        let authority = Pubkey::new_unique();
        let (deployer, _dir) = mock::deployer(MockLedger::default());
        let config = DeploymentConfig {
            rate_authority: Some(authority),
            ..with_supply("0")
        };

        let result = deployer.deploy(&config).await.unwrap();

        assert_eq!(result.config.rate_authority, authority.to_string());
        assert_eq!(
            result.config.mint_authority,
            deployer.payer_pubkey().to_string()
        );
    }

    #[tokio::test]
    async fn foreign_mint_authority_with_supply_fails_before_network() {
        let (deployer, dir) = mock::deployer(MockLedger::default());
        let config = DeploymentConfig {
            mint_authority: Some(Pubkey::new_unique()),
            ..usdc_config()
        };

        let err = deployer.deploy(&config).await.unwrap_err();

        assert!(matches!(err, DeployerError::Configuration(_)));
        assert!(deployer.ledger.submissions().is_empty());
        assert!(ResultStore::new(dir.path()).list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn foreign_mint_authority_without_supply_is_allowed() {
        let authority = Pubkey::new_unique();
        let (deployer, _dir) = mock::deployer(MockLedger::default());
        let config = DeploymentConfig {
            mint_authority: Some(authority),
            ..with_supply("0")
        };

        let result = deployer.deploy(&config).await.unwrap();
        assert_eq!(result.config.mint_authority, authority.to_string());
    }

    #[tokio::test]
    async fn read_back_failure_falls_back_to_requested_values() {
        let ledger = MockLedger::default();
        ledger.fail_reads();
        let (deployer, dir) = mock::deployer(ledger);

        let result = deployer.deploy(&usdc_config()).await.unwrap();

        assert_eq!(result.transaction_signatures.len(), 2);
        assert_eq!(result.config.interest_rate_basis_points, 500);
        assert_eq!(result.config.total_supply, "1000000000000");
        assert!(result.config.last_update_timestamp > mock::NOW);
        assert_eq!(ResultStore::new(dir.path()).list().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn creation_failure_is_fatal_and_nothing_is_persisted() {
        let ledger = MockLedger::default();
        ledger.fail_submission(0);
        let (deployer, dir) = mock::deployer(ledger);

        let err = deployer.deploy(&usdc_config()).await.unwrap_err();

        assert!(matches!(err, DeployerError::Network(_)));
        assert!(ResultStore::new(dir.path()).list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn mint_to_failure_propagates_after_mint_exists() {
        let ledger = MockLedger::default();
        ledger.fail_submission(2);
        let (deployer, dir) = mock::deployer(ledger);

        let err = deployer.deploy(&usdc_config()).await.unwrap_err();

        assert!(matches!(err, DeployerError::Network(_)));
        assert_eq!(deployer.ledger.mint_count(), 1);
        assert!(ResultStore::new(dir.path()).list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn persistence_failure_surfaces_after_on_chain_success() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let deployer = Deployer::new(
            MockLedger::default(),
            Keypair::new(),
            ResultStore::new(blocker.join("deployments")),
        );

        let err = deployer.deploy(&usdc_config()).await.unwrap_err();

        assert!(matches!(err, DeployerError::Persistence(_)));
        assert_eq!(deployer.ledger.mint_count(), 1);
    }

    #[tokio::test]
    async fn each_deployment_uses_a_fresh_mint() {
        let (deployer, _dir) = mock::deployer(MockLedger::default());

        let first = deployer.deploy(&with_supply("0")).await.unwrap();
        let second = deployer.deploy(&with_supply("0")).await.unwrap();

        assert_ne!(first.mint_address, second.mint_address);
    }
}
