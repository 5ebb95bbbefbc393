//! HarnessBuilder - Fluent API for configuring ChainHarness instances

use blocksim_common::{
    abci::ConsensusParams,
    config::{DEFAULT_CHAIN_ID, VALIDATOR_FUND_AMOUNT},
    crypto::{AccountAddress, ValidatorAddress},
    time::TimestampMillis,
    Application, Coins,
};
use blocksim_genesis::{types::Balance, GenesisConfig, ParamProfile};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

use super::{error::HarnessError, ChainHarness};
use crate::utilities::TempNodeHome;

/// Block gas ceiling handed to chain initialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GasMode {
    /// `max_gas = -1`
    Unlimited,
    /// `max_gas = 300_000_000`
    #[default]
    Fixed,
}

impl GasMode {
    pub fn consensus_params(&self) -> ConsensusParams {
        match self {
            GasMode::Unlimited => ConsensusParams::unlimited_gas(),
            GasMode::Fixed => ConsensusParams::fixed_gas(),
        }
    }
}

/// How `begin_block` picks the proposer of the new block
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposerSelection {
    /// No proposer and no vote info
    None,
    /// First validator of the staking set
    #[default]
    FirstValidator,
    /// Rotate through the bonded validators by height
    RoundRobin,
    /// Always the given operator
    Fixed(ValidatorAddress),
}

/// Complete harness configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub chain_id: String,
    /// Storage namespace of the application; a temporary directory when unset
    pub node_home: Option<PathBuf>,
    pub genesis: GenesisConfig,
    pub gas_mode: GasMode,
    /// Lift the simulated gas ceiling of the application
    pub unlimited_simulation_gas: bool,
    /// Genesis block time; the current time when unset
    pub genesis_time: Option<TimestampMillis>,
    pub proposer: ProposerSelection,
    /// Amount credited per validator by each funding round
    pub fund_amount: u64,
    /// Increment used by `skip_block`
    pub block_time_seconds: u64,
    /// RNG seed; `BLOCKSIM_TEST_SEED` or random when unset
    pub seed: Option<u64>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID.to_string(),
            node_home: None,
            genesis: GenesisConfig::default(),
            gas_mode: GasMode::default(),
            unlimited_simulation_gas: true,
            genesis_time: None,
            proposer: ProposerSelection::default(),
            fund_amount: VALIDATOR_FUND_AMOUNT,
            block_time_seconds: 5,
            seed: None,
        }
    }
}

impl HarnessConfig {
    pub fn bond_denom(&self) -> &str {
        &self.genesis.bond_denom
    }

    pub fn validate(&self) -> Result<(), HarnessError> {
        if self.chain_id.is_empty() {
            return Err(HarnessError::InvalidConfig(
                "chain id must not be empty".to_string(),
            ));
        }
        if self.block_time_seconds == 0 {
            return Err(HarnessError::InvalidConfig(
                "block time must be at least one second".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for ChainHarness instances with fluent API
///
/// # Example
///
/// ```rust,ignore
/// use blocksim_testing_framework::prelude::*;
///
/// let mut harness = HarnessBuilder::new()
///     .with_seed(7)
///     .with_genesis_time(1_700_000_000_000)
///     .with_bond_denom("uatom")
///     .build::<MemApp>()?;
///
/// harness.begin_block(false, 5)?;
/// harness.execute(b"tx".to_vec())?;
/// let response = harness.end_block()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct HarnessBuilder {
    config: HarnessConfig,
}

impl HarnessBuilder {
    /// Create new builder with defaults
    ///
    /// Default configuration:
    /// - chain id `blocksim-1`, denomination `ublk`
    /// - fixed block gas ceiling, unlimited simulation gas
    /// - tuned genesis params, first validator proposes
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration
    pub fn with_config(mut self, config: HarnessConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_node_home(mut self, node_home: impl Into<PathBuf>) -> Self {
        self.config.node_home = Some(node_home.into());
        self
    }

    pub fn with_chain_id(mut self, chain_id: impl Into<String>) -> Self {
        self.config.chain_id = chain_id.into();
        self
    }

    /// Bonding, fee and mint denomination threaded through every module
    pub fn with_bond_denom(mut self, denom: impl Into<String>) -> Self {
        self.config.genesis.bond_denom = denom.into();
        self
    }

    pub fn with_gas_mode(mut self, gas_mode: GasMode) -> Self {
        self.config.gas_mode = gas_mode;
        self
    }

    pub fn with_unlimited_simulation_gas(mut self, unlimited: bool) -> Self {
        self.config.unlimited_simulation_gas = unlimited;
        self
    }

    pub fn with_genesis_time(mut self, time: TimestampMillis) -> Self {
        self.config.genesis_time = Some(time);
        self
    }

    pub fn with_proposer(mut self, proposer: ProposerSelection) -> Self {
        self.config.proposer = proposer;
        self
    }

    pub fn with_param_profile(mut self, profile: ParamProfile) -> Self {
        self.config.genesis.param_profile = profile;
        self
    }

    /// Replace the whole genesis state of `module`
    pub fn with_genesis_override(mut self, module: impl Into<String>, state: Value) -> Self {
        self.config.genesis.module_overrides.insert(module.into(), state);
        self
    }

    pub fn with_fund_amount(mut self, amount: u64) -> Self {
        self.config.fund_amount = amount;
        self
    }

    pub fn with_block_time(mut self, seconds: u64) -> Self {
        self.config.block_time_seconds = seconds;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Fund an extra account at genesis
    pub fn with_funded_account(mut self, address: AccountAddress, coins: Coins) -> Self {
        self.config.genesis.extra_balances.push(Balance { address, coins });
        self
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Create the application and initialize the chain.
    ///
    /// Without a configured node home the application is namespaced under a
    /// temporary directory that lives as long as the harness.
    pub fn build<A: Application>(self) -> Result<ChainHarness<A>, HarnessError> {
        let mut config = self.config;
        config.validate()?;

        let temp_home = match &config.node_home {
            Some(_) => None,
            None => {
                let home = TempNodeHome::new()?;
                config.node_home = Some(home.path_buf());
                Some(home)
            }
        };

        let node_home = config.node_home.clone().unwrap_or_default();
        let app = ChainHarness::<A>::new_app(&node_home, &config)?;
        let mut harness = ChainHarness::init(app, config)?;
        harness.attach_temp_home(temp_home);
        Ok(harness)
    }
}
