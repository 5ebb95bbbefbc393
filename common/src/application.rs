//! The contract between the block harness and the state machine it drives.
//!
//! An [`Application`] exposes the ABCI-style lifecycle entry points plus the
//! handful of keeper accessors the harness needs during bootstrap: reading
//! the validator set, seeding slashing signing info and crediting accounts.
//! Everything else about the application is opaque to the harness.

use indexmap::IndexMap;
use serde_json::Value;
use std::path::Path;
use thiserror::Error;

use crate::{
    abci::{
        RequestFinalizeBlock, RequestInitChain, RequestPrepareProposal, RequestProcessProposal,
        ResponseCommit, ResponseFinalizeBlock, ResponseInitChain, ResponsePrepareProposal,
        ResponseProcessProposal,
    },
    coin::{CoinError, Coins},
    config::{FLAG_SIMULATION_GAS_LIMIT, FLAG_TRACE},
    context::BlockContext,
    crypto::{AccountAddress, ConsensusAddress, Hash, ValidatorAddress},
    staking::{ValidatorRecord, ValidatorSigningInfo},
};

/// Module identifier -> module genesis state, in module registration order.
pub type AppGenesisState = IndexMap<String, Value>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid genesis state: {0}")]
    InvalidGenesis(String),
    #[error("Chain is not initialized")]
    NotInitialized,
    #[error("Chain is already initialized")]
    AlreadyInitialized,
    #[error("Unknown validator {0}")]
    UnknownValidator(String),
    #[error("Insufficient funds on {address}: needed {needed}")]
    InsufficientFunds { address: String, needed: String },
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Store error: {0}")]
    Store(String),
    #[error("{0}")]
    Aborted(String),
    #[error(transparent)]
    Coins(#[from] CoinError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Read-only view of the options an application is constructed with.
pub trait AppOptions {
    fn get(&self, key: &str) -> Option<Value>;

    fn get_bool(&self, key: &str) -> bool {
        matches!(self.get(key), Some(Value::Bool(true)))
    }

    fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.as_u64())
    }
}

/// Options used for test chains: tracing is always on and the simulated gas
/// ceiling can be lifted entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebugAppOptions {
    pub simulation_gas_limit: Option<u64>,
}

impl DebugAppOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_unlimited_simulation_gas() -> Self {
        Self {
            simulation_gas_limit: Some(u64::MAX),
        }
    }
}

impl AppOptions for DebugAppOptions {
    fn get(&self, key: &str) -> Option<Value> {
        match key {
            FLAG_TRACE => Some(Value::Bool(true)),
            FLAG_SIMULATION_GAS_LIMIT => self.simulation_gas_limit.map(Value::from),
            _ => None,
        }
    }
}

impl AppOptions for IndexMap<String, Value> {
    fn get(&self, key: &str) -> Option<Value> {
        IndexMap::get(self, key).cloned()
    }
}

pub trait Application: Sized {
    /// Create an application backed by an in-memory store. `node_home` is
    /// only a namespace; nothing is persisted there across runs.
    fn new(node_home: &Path, chain_id: &str, options: &dyn AppOptions) -> Result<Self, AppError>;

    /// Default genesis state of every registered module.
    fn default_genesis(&self) -> AppGenesisState;

    fn init_chain(&mut self, request: RequestInitChain) -> Result<ResponseInitChain, AppError>;

    /// Begin-of-block hook, run under the context of the block being built.
    fn begin_block(&mut self, ctx: &BlockContext) -> Result<(), AppError>;

    fn prepare_proposal(
        &mut self,
        request: RequestPrepareProposal,
    ) -> Result<ResponsePrepareProposal, AppError>;

    fn process_proposal(
        &mut self,
        request: RequestProcessProposal,
    ) -> Result<ResponseProcessProposal, AppError>;

    fn finalize_block(
        &mut self,
        request: RequestFinalizeBlock,
    ) -> Result<ResponseFinalizeBlock, AppError>;

    fn commit(&mut self) -> Result<ResponseCommit, AppError>;

    /// Every validator known to staking, ordered by operator address.
    fn validators(&self) -> Result<Vec<ValidatorRecord>, AppError>;

    fn validator(&self, operator: &ValidatorAddress) -> Result<Option<ValidatorRecord>, AppError>;

    fn set_validator_signing_info(
        &mut self,
        ctx: &BlockContext,
        info: ValidatorSigningInfo,
    ) -> Result<(), AppError>;

    fn validator_signing_info(
        &self,
        address: &ConsensusAddress,
    ) -> Result<Option<ValidatorSigningInfo>, AppError>;

    /// Mint `coins` and credit them to `address`, increasing total supply.
    fn fund_account(
        &mut self,
        ctx: &BlockContext,
        address: &AccountAddress,
        coins: &Coins,
    ) -> Result<(), AppError>;

    fn balance(&self, address: &AccountAddress, denom: &str) -> Result<u64, AppError>;

    /// State root produced by the last commit (or by chain initialization).
    fn last_app_hash(&self) -> Hash;
}
