//! Prelude module for convenient imports
//!
//! ```rust,ignore
//! use blocksim_testing_framework::prelude::*;
//! ```

pub use crate::app::{AppTx, MemApp};
pub use crate::harness::{
    ChainHarness, DriverState, GasMode, HarnessBuilder, HarnessConfig, HarnessError,
    ParamTypeRegistry, Phase, ProposerSelection, ValidatorFunder,
};
pub use crate::invariants::{
    check_block_progression, check_state_unchanged, check_supply_conservation, StateSnapshot,
};
pub use crate::orchestrator::TestRng;
pub use crate::scenarios::{parse_scenario, ExecutionReport, ScenarioExecutor, TestScenario};
pub use crate::utilities::TempNodeHome;

pub use blocksim_common::{
    abci::{ProposalStatus, ResponseFinalizeBlock, Tx},
    crypto::{AccountAddress, ConsensusAddress, PrivateKey, ValidatorAddress, ValidatorKey},
    Application, BlockContext, Coin, Coins,
};
pub use blocksim_genesis::{GenesisConfig, ParamProfile};
