// File: testing-framework/src/harness/mod.rs
//
// ChainHarness - deterministic block-execution harness
//
// Stands in for consensus and networking: builds a single-validator
// genesis, initializes the application, then drives it block by block
// through Prepare -> Process -> Finalize -> Commit while the test queues
// transactions, moves time and picks the proposer.

mod builder;
mod driver;
mod error;
mod funder;
mod registry;

pub use builder::{GasMode, HarnessBuilder, HarnessConfig, ProposerSelection};
pub use driver::{BlockCycleDriver, DriverState, PendingBlock};
pub use error::{HarnessError, Phase};
pub use funder::ValidatorFunder;
pub use registry::ParamTypeRegistry;

use blocksim_common::{
    abci::{RequestInitChain, ResponseFinalizeBlock, Tx},
    crypto::{AccountAddress, ConsensusAddress, PrivateKey, ValidatorAddress, ValidatorKey},
    params::ParamSet,
    staking::ValidatorSigningInfo,
    time::{get_current_time_in_millis, TimestampMillis, TimestampSeconds},
    AppError, Application, BlockContext, Coins, DebugAppOptions,
};
use blocksim_genesis::{types::RewardsParams, GenesisBuilder};
use std::path::Path;

use crate::{orchestrator::TestRng, utilities::TempNodeHome};

/// Result alias for harness operations
pub type Result<T> = std::result::Result<T, HarnessError>;

fn query_error(source: AppError) -> HarnessError {
    HarnessError::app(Phase::Query, source)
}

/// Single-process chain driven block by block.
///
/// Height and time only move through [`ChainHarness::begin_block`]; a
/// failed block cycle halts the harness and every later block operation
/// returns [`HarnessError::Halted`].
pub struct ChainHarness<A: Application> {
    app: A,
    ctx: BlockContext,
    driver: BlockCycleDriver,
    validator_keys: Vec<ValidatorKey>,
    param_registry: ParamTypeRegistry,
    config: HarnessConfig,
    genesis_time: TimestampMillis,
    rng: TestRng,
    _temp_home: Option<TempNodeHome>,
}

impl<A: Application> ChainHarness<A> {
    /// Create the application namespaced under `node_home`, with debug
    /// options: tracing on, simulated gas lifted when configured.
    pub fn new_app(node_home: &Path, config: &HarnessConfig) -> Result<A> {
        let options = if config.unlimited_simulation_gas {
            DebugAppOptions::with_unlimited_simulation_gas()
        } else {
            DebugAppOptions::new()
        };
        log::debug!(
            "Creating application for chain {} under {}",
            config.chain_id,
            node_home.display()
        );
        A::new(node_home, &config.chain_id, &options)
            .map_err(|source| HarnessError::app(Phase::NewApp, source))
    }

    /// Build genesis, initialize the chain and seed validator signing info.
    ///
    /// The genesis document is consumed by chain initialization and not
    /// kept. Any failure here is a setup bug and is returned as a fatal
    /// error.
    ///
    /// # Errors
    ///
    /// - [`HarnessError::InvalidConfig`] for an empty chain id or a zero
    ///   block time
    /// - [`HarnessError::Genesis`] when the genesis state cannot be built or
    ///   violates the supply invariants
    /// - [`HarnessError::Application`] with [`Phase::InitChain`] or
    ///   [`Phase::SigningInfo`] when the application refuses either call
    pub fn init(mut app: A, config: HarnessConfig) -> Result<Self> {
        config.validate()?;

        let mut rng = TestRng::from_option(config.seed);
        let genesis_time = config
            .genesis_time
            .unwrap_or_else(get_current_time_in_millis);

        let (genesis, validator_key) =
            GenesisBuilder::new(config.genesis.clone()).build(&app, &mut rng)?;
        let app_state_bytes = genesis.to_bytes()?;
        let modules = genesis.len();
        drop(genesis);

        let response = app
            .init_chain(RequestInitChain {
                chain_id: config.chain_id.clone(),
                time: genesis_time,
                consensus_params: config.gas_mode.consensus_params(),
                validators: Vec::new(),
                app_state_bytes,
                initial_height: 1,
            })
            .map_err(|source| HarnessError::app(Phase::InitChain, source))?;

        log::info!(
            "Initialized chain {} with {} genesis modules, {} validator update(s), app hash {}",
            config.chain_id,
            modules,
            response.validators.len(),
            response.app_hash
        );

        let ctx = BlockContext::genesis(config.chain_id.clone(), genesis_time);

        let validators = app.validators().map_err(query_error)?;
        for validator in &validators {
            let info = ValidatorSigningInfo::new(validator.consensus_address(), ctx.height);
            app.set_validator_signing_info(&ctx, info)
                .map_err(|source| HarnessError::app(Phase::SigningInfo, source))?;
        }
        log::debug!("Seeded signing info for {} validator(s)", validators.len());

        let harness = Self {
            app,
            ctx,
            driver: BlockCycleDriver::new(),
            validator_keys: vec![validator_key],
            param_registry: ParamTypeRegistry::new(),
            config,
            genesis_time,
            rng,
            _temp_home: None,
        };
        harness.setup_param_types()?;
        Ok(harness)
    }

    pub(crate) fn attach_temp_home(&mut self, home: Option<TempNodeHome>) {
        self._temp_home = home;
    }

    /// Open the next block: height + 1 and time + `seconds`, or exactly one
    /// second when `advance_epoch` is set. The proposer follows
    /// [`HarnessConfig::proposer`].
    ///
    /// # Errors
    ///
    /// - [`HarnessError::Halted`] after a failed block cycle
    /// - [`HarnessError::InvalidPhase`] when a block is already open
    /// - [`HarnessError::UnknownValidator`] or [`HarnessError::NoValidators`]
    ///   when no proposer can be selected; nothing is advanced
    /// - [`HarnessError::Application`] with [`Phase::BeginBlock`] when the
    ///   hook fails; the harness halts and the context is left unchanged
    pub fn begin_block(&mut self, advance_epoch: bool, seconds: TimestampSeconds) -> Result<()> {
        self.driver.ensure_not_halted()?;
        let proposer = self.select_proposer()?;
        self.driver
            .begin(&mut self.app, &mut self.ctx, advance_epoch, seconds, proposer)
    }

    /// Like [`ChainHarness::begin_block`] with `operator` as proposer,
    /// regardless of the configured selection.
    pub fn begin_block_with_proposer(
        &mut self,
        advance_epoch: bool,
        seconds: TimestampSeconds,
        operator: &ValidatorAddress,
    ) -> Result<()> {
        self.driver.ensure_not_halted()?;
        let proposer = self.consensus_address_of(operator)?;
        self.driver.begin(
            &mut self.app,
            &mut self.ctx,
            advance_epoch,
            seconds,
            Some(proposer),
        )
    }

    /// Queue a transaction into the open block. Content is not inspected.
    pub fn execute(&mut self, tx: impl Into<Tx>) -> Result<()> {
        self.driver.push(tx.into())
    }

    /// Prepare, process, finalize and commit the open block.
    ///
    /// # Returns
    ///
    /// The finalize response: one result per queued transaction, in order.
    ///
    /// # Errors
    ///
    /// - [`HarnessError::ProposalRejected`] when the application does not
    ///   accept the proposal; nothing is finalized or committed
    /// - [`HarnessError::Application`] naming the failed phase
    /// - [`HarnessError::InvalidPhase`] without an open block
    ///
    /// Every error but `InvalidPhase` halts the harness.
    pub fn end_block(&mut self) -> Result<ResponseFinalizeBlock> {
        self.driver.end(&mut self.app, &self.ctx)
    }

    /// Commit an empty block `block_time_seconds` after the current one.
    pub fn skip_block(&mut self) -> Result<ResponseFinalizeBlock> {
        let seconds = self.config.block_time_seconds;
        self.begin_block(false, seconds)?;
        self.end_block()
    }

    pub fn skip_blocks(&mut self, count: u64) -> Result<()> {
        for _ in 0..count {
            self.skip_block()?;
        }
        Ok(())
    }

    /// Commit one empty block whose time is `seconds` after the current
    /// block time.
    pub fn increase_time(&mut self, seconds: TimestampSeconds) -> Result<ResponseFinalizeBlock> {
        self.begin_block(false, seconds)?;
        self.end_block()
    }

    fn select_proposer(&self) -> Result<Option<ConsensusAddress>> {
        match &self.config.proposer {
            ProposerSelection::None => Ok(None),
            ProposerSelection::FirstValidator => {
                let validators = self.app.validators().map_err(query_error)?;
                validators
                    .first()
                    .map(|v| Some(v.consensus_address()))
                    .ok_or(HarnessError::NoValidators)
            }
            ProposerSelection::RoundRobin => {
                let bonded: Vec<_> = self
                    .app
                    .validators()
                    .map_err(query_error)?
                    .into_iter()
                    .filter(|v| v.is_bonded() && !v.jailed)
                    .collect();
                if bonded.is_empty() {
                    return Err(HarnessError::NoValidators);
                }
                let index = (self.ctx.height % bonded.len() as u64) as usize;
                Ok(Some(bonded[index].consensus_address()))
            }
            ProposerSelection::Fixed(operator) => self.consensus_address_of(operator).map(Some),
        }
    }

    fn consensus_address_of(&self, operator: &ValidatorAddress) -> Result<ConsensusAddress> {
        self.app
            .validator(operator)
            .map_err(query_error)?
            .map(|v| v.consensus_address())
            .ok_or_else(|| HarnessError::UnknownValidator(operator.to_string()))
    }

    /// Credit every known validator account with the configured amount in
    /// the bond denomination. Additive on each call.
    ///
    /// # Errors
    ///
    /// - [`HarnessError::Halted`] after a failed block cycle
    /// - [`HarnessError::Funding`] for the first account the application
    ///   refuses to credit; earlier accounts stay credited
    pub fn fund_validators(&mut self) -> Result<()> {
        self.driver.ensure_not_halted()?;
        ValidatorFunder::new(self.config.bond_denom(), self.config.fund_amount).fund(
            &mut self.app,
            &self.ctx,
            &self.validator_keys,
        )
    }

    pub fn fund_account(&mut self, address: &AccountAddress, coins: &Coins) -> Result<()> {
        self.driver.ensure_not_halted()?;
        funder::fund_account(&mut self.app, &self.ctx, address, coins)
    }

    /// Generate a fresh account from the harness RNG and credit it with
    /// `coins`.
    ///
    /// # Returns
    ///
    /// The signing key of the new account; its address is
    /// [`PrivateKey::account_address`].
    ///
    /// # Errors
    ///
    /// - [`HarnessError::Halted`] after a failed block cycle
    /// - [`HarnessError::Funding`] when the application refuses the credit
    pub fn init_account(&mut self, coins: &Coins) -> Result<PrivateKey> {
        self.driver.ensure_not_halted()?;
        let key = PrivateKey::generate(&mut self.rng);
        funder::fund_account(&mut self.app, &self.ctx, &key.account_address(), coins)?;
        log::debug!("Initialized account {} with {}", key.account_address(), coins);
        Ok(key)
    }

    /// [`ChainHarness::init_account`] `count` times, stopping at the first
    /// failure.
    pub fn init_accounts(&mut self, coins: &Coins, count: usize) -> Result<Vec<PrivateKey>> {
        (0..count).map(|_| self.init_account(coins)).collect()
    }

    /// Track an extra validator key so funding rounds cover it.
    pub fn add_validator_key(&mut self, key: ValidatorKey) {
        self.validator_keys.push(key);
    }

    /// Operator addresses of the current staking set, ordered as the
    /// application returns them.
    pub fn validator_addresses(&self) -> Result<Vec<ValidatorAddress>> {
        let validators = self.app.validators().map_err(query_error)?;
        Ok(validators.iter().map(|v| v.operator_address).collect())
    }

    pub fn register_param_set(&self, params: &dyn ParamSet) -> Result<()> {
        self.param_registry.register(params)
    }

    /// Register the parameter sets every harness exposes.
    pub fn setup_param_types(&self) -> Result<()> {
        self.register_param_set(&RewardsParams::default())
    }

    pub fn param_registry(&self) -> ParamTypeRegistry {
        self.param_registry.clone()
    }

    pub fn balance(&self, address: &AccountAddress, denom: &str) -> Result<u64> {
        self.app.balance(address, denom).map_err(query_error)
    }

    /// Balance of validator `index` in the bond denomination
    pub fn validator_balance(&self, index: usize) -> Result<u64> {
        let key = self
            .validator_keys
            .get(index)
            .ok_or_else(|| HarnessError::UnknownValidator(format!("#{}", index)))?;
        self.balance(&key.account_address(), self.config.bond_denom())
    }

    pub fn context(&self) -> &BlockContext {
        &self.ctx
    }

    /// Key of the genesis validator
    pub fn validator_key(&self) -> &ValidatorKey {
        // init always seeds the genesis key and keys are never removed
        &self.validator_keys[0]
    }

    pub fn validator_keys(&self) -> &[ValidatorKey] {
        &self.validator_keys
    }

    pub fn height(&self) -> u64 {
        self.ctx.height
    }

    pub fn block_time(&self) -> TimestampMillis {
        self.ctx.time
    }

    pub fn genesis_time(&self) -> TimestampMillis {
        self.genesis_time
    }

    pub fn chain_id(&self) -> &str {
        &self.ctx.chain_id
    }

    pub fn state(&self) -> DriverState {
        self.driver.state()
    }

    pub fn pending(&self) -> Option<&PendingBlock> {
        self.driver.pending()
    }

    pub fn app(&self) -> &A {
        &self.app
    }

    pub fn app_mut(&mut self) -> &mut A {
        &mut self.app
    }

    pub fn node_home(&self) -> Option<&Path> {
        self.config.node_home.as_deref()
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn rng(&self) -> &TestRng {
        &self.rng
    }
}
