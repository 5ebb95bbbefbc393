// File: testing-framework/src/app/mod.rs
//
// MemApp - in-memory reference application
//
// A small state machine with auth, bank, staking and slashing state kept
// in a MemStore. It lets the harness be exercised end to end without a
// real chain: it records every request it receives, its proposal verdict
// is configurable and any entry point can be made to fail once.

mod store;
mod tx;

pub use store::{Changes, EntryState, MemStore};
pub use tx::{AppTx, CODE_INSUFFICIENT_FUNDS, CODE_INVALID_REQUEST, GAS_PER_BYTE};

use blocksim_common::{
    abci::{
        BlockIdFlag, ConsensusParams, Event, ExecTxResult, ProposalStatus, RequestFinalizeBlock,
        RequestInitChain, RequestPrepareProposal, RequestProcessProposal, ResponseCommit,
        ResponseFinalizeBlock, ResponseInitChain, ResponsePrepareProposal,
        ResponseProcessProposal, Tx, ValidatorUpdate, VoteInfo,
    },
    config::{
        AUTH_MODULE, BANK_MODULE, FLAG_SIMULATION_GAS_LIMIT, FLAG_TRACE, SLASHING_MODULE,
        STAKING_MODULE,
    },
    crypto::{AccountAddress, ConsensusAddress, Hash, ValidatorAddress},
    staking::{Delegation, ValidatorRecord, ValidatorSigningInfo},
    AppError, AppGenesisState, AppOptions, Application, BlockContext, Coin, Coins,
};
use blocksim_genesis::{
    types::{default_app_genesis, AuthGenesis, BankGenesis, BaseAccount, SlashingGenesis, StakingGenesis},
    validate_genesis, GenesisDocument,
};
use serde_json::Value;
use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use crate::harness::Phase;

const ACCOUNT_PREFIX: &[u8] = b"acc/";
const BALANCE_PREFIX: &[u8] = b"bal/";
const VALIDATOR_PREFIX: &[u8] = b"val/";
const DELEGATION_PREFIX: &[u8] = b"del/";
const SIGNING_INFO_PREFIX: &[u8] = b"sig/";
const MODULE_PREFIX: &[u8] = b"mod/";
const SUPPLY_KEY: &[u8] = b"supply";

fn key(prefix: &[u8], suffix: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + suffix.len());
    key.extend_from_slice(prefix);
    key.extend_from_slice(suffix);
    key
}

fn invalid_genesis(err: impl std::fmt::Display) -> AppError {
    AppError::InvalidGenesis(err.to_string())
}

pub struct MemApp {
    node_home: PathBuf,
    chain_id: String,
    trace: bool,
    simulation_gas_limit: Option<u64>,
    store: MemStore,
    consensus_params: Option<ConsensusParams>,
    last_height: u64,
    last_app_hash: Hash,
    current: Option<BlockContext>,
    finalized: Option<u64>,
    proposal_verdict: ProposalStatus,
    reject_next: bool,
    failures: HashSet<Phase>,
    last_prepare: Option<RequestPrepareProposal>,
    last_process: Option<RequestProcessProposal>,
    last_finalize: Option<RequestFinalizeBlock>,
}

impl MemApp {
    pub fn is_initialized(&self) -> bool {
        self.consensus_params.is_some()
    }

    fn ensure_initialized(&self) -> Result<(), AppError> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(AppError::NotInitialized)
        }
    }

    // One-shot injected failure
    fn check_failure(&mut self, phase: Phase) -> Result<(), AppError> {
        if self.failures.remove(&phase) {
            log::debug!("Injected failure triggered during {}", phase);
            return Err(AppError::Aborted(format!("injected failure during {}", phase)));
        }
        Ok(())
    }

    /// Verdict returned by every later process-proposal call.
    pub fn set_proposal_verdict(&mut self, status: ProposalStatus) {
        self.proposal_verdict = status;
    }

    /// Reject only the next proposal.
    pub fn reject_next_proposal(&mut self) {
        self.reject_next = true;
    }

    /// Make the next call of the entry point behind `phase` fail.
    pub fn inject_failure(&mut self, phase: Phase) {
        self.failures.insert(phase);
    }

    pub fn clear_failures(&mut self) {
        self.failures.clear();
    }

    pub fn last_prepare_request(&self) -> Option<&RequestPrepareProposal> {
        self.last_prepare.as_ref()
    }

    pub fn last_process_request(&self) -> Option<&RequestProcessProposal> {
        self.last_process.as_ref()
    }

    pub fn last_finalize_request(&self) -> Option<&RequestFinalizeBlock> {
        self.last_finalize.as_ref()
    }

    /// Context of the block opened by the last begin-block hook
    pub fn current_block(&self) -> Option<&BlockContext> {
        self.current.as_ref()
    }

    pub fn consensus_params(&self) -> Option<&ConsensusParams> {
        self.consensus_params.as_ref()
    }

    pub fn trace_enabled(&self) -> bool {
        self.trace
    }

    pub fn simulation_gas_limit(&self) -> Option<u64> {
        self.simulation_gas_limit
    }

    pub fn node_home(&self) -> &Path {
        &self.node_home
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    /// Height of the last committed block, zero before the first one
    pub fn committed_height(&self) -> u64 {
        self.last_height
    }

    pub fn store(&self) -> &MemStore {
        &self.store
    }

    pub fn account(&self, address: &AccountAddress) -> Result<Option<BaseAccount>, AppError> {
        self.store.get_json(&key(ACCOUNT_PREFIX, address.as_bytes()))
    }

    pub fn balances(&self, address: &AccountAddress) -> Result<Coins, AppError> {
        Ok(self
            .store
            .get_json(&key(BALANCE_PREFIX, address.as_bytes()))?
            .unwrap_or_default())
    }

    pub fn supply(&self) -> Result<Coins, AppError> {
        Ok(self.store.get_json(SUPPLY_KEY)?.unwrap_or_default())
    }

    /// Sum of every account balance
    pub fn total_balances(&self) -> Result<Coins, AppError> {
        let mut total = Coins::new();
        for coins in self.store.scan_prefix_json::<Coins>(BALANCE_PREFIX)? {
            total.add(&coins);
        }
        Ok(total)
    }

    pub fn delegations(&self) -> Result<Vec<Delegation>, AppError> {
        self.store.scan_prefix_json(DELEGATION_PREFIX)
    }

    /// Genesis state of `module` as it was applied
    pub fn module_state(&self, module: &str) -> Result<Option<Value>, AppError> {
        self.store.get_json(&key(MODULE_PREFIX, module.as_bytes()))
    }

    fn set_balances(&mut self, address: &AccountAddress, coins: &Coins) -> Result<(), AppError> {
        self.store
            .set_json(key(BALANCE_PREFIX, address.as_bytes()), coins)
    }

    fn ensure_account(&mut self, address: &AccountAddress) -> Result<(), AppError> {
        let account_key = key(ACCOUNT_PREFIX, address.as_bytes());
        if self.store.contains(&account_key) {
            return Ok(());
        }
        let number = self.store.scan_prefix(ACCOUNT_PREFIX).len() as u64;
        self.store
            .set_json(account_key, &BaseAccount::new(*address, number))
    }

    fn apply_genesis(&mut self, doc: &GenesisDocument) -> Result<Vec<ValidatorUpdate>, AppError> {
        let auth: AuthGenesis = doc.module(AUTH_MODULE).map_err(invalid_genesis)?;
        let bank: BankGenesis = doc.module(BANK_MODULE).map_err(invalid_genesis)?;
        let staking: StakingGenesis = doc.module(STAKING_MODULE).map_err(invalid_genesis)?;
        let slashing: SlashingGenesis = doc
            .module_or_default(SLASHING_MODULE)
            .map_err(invalid_genesis)?;

        for account in &auth.accounts {
            self.store
                .set_json(key(ACCOUNT_PREFIX, account.address.as_bytes()), account)?;
        }
        for balance in &bank.balances {
            self.set_balances(&balance.address, &balance.coins)?;
        }
        self.store.set_json(SUPPLY_KEY, &bank.supply)?;

        let mut updates = Vec::new();
        for validator in &staking.validators {
            self.store.set_json(
                key(VALIDATOR_PREFIX, validator.operator_address.as_bytes()),
                validator,
            )?;
            if validator.is_bonded() {
                updates.push(ValidatorUpdate {
                    pub_key: validator.consensus_pubkey,
                    power: validator.voting_power(),
                });
            }
        }
        for delegation in &staking.delegations {
            let mut suffix = delegation.delegator_address.as_bytes().to_vec();
            suffix.extend_from_slice(delegation.validator_address.as_bytes());
            self.store.set_json(key(DELEGATION_PREFIX, &suffix), delegation)?;
        }
        for info in &slashing.signing_infos {
            self.store
                .set_json(key(SIGNING_INFO_PREFIX, info.address.as_bytes()), info)?;
        }

        for module in doc.modules() {
            if let Some(state) = doc.get_raw(module) {
                self.store
                    .set_json(key(MODULE_PREFIX, module.as_bytes()), state)?;
            }
        }

        Ok(updates)
    }

    fn execute_tx(&mut self, tx: &[u8]) -> ExecTxResult {
        match AppTx::decode(tx) {
            Some(AppTx::Transfer { from, to, amount }) => {
                match self.transfer(&from, &to, &amount) {
                    Ok(()) => tx::success(tx, vec![tx::transfer_event(&from, &to, &amount)]),
                    Err(AppError::InsufficientFunds { address, needed }) => tx::failure(
                        tx,
                        CODE_INSUFFICIENT_FUNDS,
                        BANK_MODULE,
                        format!("insufficient funds on {}: needed {}", address, needed),
                    ),
                    Err(err) => tx::failure(tx, CODE_INVALID_REQUEST, "sdk", err.to_string()),
                }
            }
            None => tx::success(tx, Vec::new()),
        }
    }

    fn transfer(
        &mut self,
        from: &AccountAddress,
        to: &AccountAddress,
        amount: &Coins,
    ) -> Result<(), AppError> {
        amount.validate()?;

        let mut sender = self.balances(from)?;
        for coin in amount.iter() {
            if !sender.checked_sub_coin(coin) {
                return Err(AppError::InsufficientFunds {
                    address: from.to_string(),
                    needed: amount.to_string(),
                });
            }
        }
        self.set_balances(from, &sender)?;

        let mut recipient = self.balances(to)?;
        recipient.add(amount);
        self.set_balances(to, &recipient)?;
        self.ensure_account(to)
    }

    // Liveness bookkeeping from the votes of the block
    fn record_votes(&mut self, votes: &[VoteInfo]) -> Result<(), AppError> {
        for vote in votes {
            let info_key = key(SIGNING_INFO_PREFIX, vote.validator.as_bytes());
            let Some(mut info) = self.store.get_json::<ValidatorSigningInfo>(&info_key)? else {
                continue;
            };
            info.index_offset += 1;
            if vote.block_id_flag != BlockIdFlag::Commit {
                info.missed_blocks_counter += 1;
            }
            self.store.set_json(info_key, &info)?;
        }
        Ok(())
    }
}

impl Application for MemApp {
    fn new(node_home: &Path, chain_id: &str, options: &dyn AppOptions) -> Result<Self, AppError> {
        if chain_id.is_empty() {
            return Err(AppError::InvalidRequest("empty chain id".to_string()));
        }
        Ok(Self {
            node_home: node_home.to_path_buf(),
            chain_id: chain_id.to_string(),
            trace: options.get_bool(FLAG_TRACE),
            simulation_gas_limit: options.get_u64(FLAG_SIMULATION_GAS_LIMIT),
            store: MemStore::new(),
            consensus_params: None,
            last_height: 0,
            last_app_hash: Hash::zero(),
            current: None,
            finalized: None,
            proposal_verdict: ProposalStatus::Accept,
            reject_next: false,
            failures: HashSet::new(),
            last_prepare: None,
            last_process: None,
            last_finalize: None,
        })
    }

    fn default_genesis(&self) -> AppGenesisState {
        match default_app_genesis() {
            Ok(state) => state,
            Err(err) => {
                log::warn!("Failed to serialize default genesis: {}", err);
                AppGenesisState::new()
            }
        }
    }

    fn init_chain(&mut self, request: RequestInitChain) -> Result<ResponseInitChain, AppError> {
        if self.is_initialized() {
            return Err(AppError::AlreadyInitialized);
        }
        self.check_failure(Phase::InitChain)?;
        if request.chain_id != self.chain_id {
            return Err(AppError::InvalidRequest(format!(
                "chain id {} does not match {}",
                request.chain_id, self.chain_id
            )));
        }

        let doc = GenesisDocument::from_bytes(&request.app_state_bytes).map_err(invalid_genesis)?;
        validate_genesis(&doc).map_err(invalid_genesis)?;

        let validators = self.apply_genesis(&doc)?;
        self.consensus_params = Some(request.consensus_params);
        self.last_height = request.initial_height.saturating_sub(1);
        self.last_app_hash = self.store.commit();

        log::debug!(
            "InitChain {}: {} module(s), {} bonded validator(s)",
            self.chain_id,
            doc.len(),
            validators.len()
        );

        Ok(ResponseInitChain {
            validators,
            app_hash: self.last_app_hash,
        })
    }

    fn begin_block(&mut self, ctx: &BlockContext) -> Result<(), AppError> {
        self.ensure_initialized()?;
        self.check_failure(Phase::BeginBlock)?;
        if ctx.chain_id != self.chain_id {
            return Err(AppError::InvalidRequest(format!(
                "block for chain {} on {}",
                ctx.chain_id, self.chain_id
            )));
        }
        if ctx.height != self.last_height + 1 {
            return Err(AppError::InvalidRequest(format!(
                "expected height {}, got {}",
                self.last_height + 1,
                ctx.height
            )));
        }
        self.current = Some(ctx.clone());
        Ok(())
    }

    fn prepare_proposal(
        &mut self,
        request: RequestPrepareProposal,
    ) -> Result<ResponsePrepareProposal, AppError> {
        self.ensure_initialized()?;
        self.check_failure(Phase::Prepare)?;

        let mut budget = request.max_tx_bytes;
        let mut txs: Vec<Tx> = Vec::with_capacity(request.txs.len());
        for tx in &request.txs {
            let size = tx.len() as i64;
            if size > budget {
                break;
            }
            budget -= size;
            txs.push(tx.clone());
        }
        if txs.len() < request.txs.len() {
            log::debug!(
                "Prepare dropped {} tx(s) over the byte budget",
                request.txs.len() - txs.len()
            );
        }

        self.last_prepare = Some(request);
        Ok(ResponsePrepareProposal { txs })
    }

    fn process_proposal(
        &mut self,
        request: RequestProcessProposal,
    ) -> Result<ResponseProcessProposal, AppError> {
        self.ensure_initialized()?;
        self.check_failure(Phase::Process)?;

        let status = if request.height != self.last_height + 1 {
            ProposalStatus::Reject
        } else if self.reject_next {
            self.reject_next = false;
            ProposalStatus::Reject
        } else {
            self.proposal_verdict
        };

        self.last_process = Some(request);
        Ok(ResponseProcessProposal { status })
    }

    fn finalize_block(
        &mut self,
        request: RequestFinalizeBlock,
    ) -> Result<ResponseFinalizeBlock, AppError> {
        self.ensure_initialized()?;
        self.check_failure(Phase::Finalize)?;
        if request.height != self.last_height + 1 {
            return Err(AppError::InvalidRequest(format!(
                "cannot finalize height {} after {}",
                request.height, self.last_height
            )));
        }

        self.record_votes(&request.decided_last_commit)?;

        let tx_results: Vec<ExecTxResult> =
            request.txs.iter().map(|tx| self.execute_tx(tx)).collect();
        let failed = tx_results.iter().filter(|r| !r.is_ok()).count();

        let mut block_event = Event::new("finalize_block")
            .with_attribute("height", request.height.to_string())
            .with_attribute("txs", tx_results.len().to_string());
        if let Some(proposer) = &request.proposer {
            block_event = block_event.with_attribute("proposer", proposer.to_string());
        }

        log::debug!(
            "Finalized height {} with {} tx(s), {} failed",
            request.height,
            tx_results.len(),
            failed
        );

        self.finalized = Some(request.height);
        let app_hash = self.store.preview_root();
        self.last_finalize = Some(request);

        Ok(ResponseFinalizeBlock {
            events: vec![block_event],
            tx_results,
            validator_updates: Vec::new(),
            app_hash,
        })
    }

    fn commit(&mut self) -> Result<ResponseCommit, AppError> {
        self.ensure_initialized()?;
        self.check_failure(Phase::Commit)?;
        let height = self
            .finalized
            .take()
            .ok_or_else(|| AppError::InvalidRequest("commit without a finalized block".to_string()))?;

        self.last_app_hash = self.store.commit();
        self.last_height = height;
        self.current = None;
        Ok(ResponseCommit { retain_height: 0 })
    }

    fn validators(&self) -> Result<Vec<ValidatorRecord>, AppError> {
        self.store.scan_prefix_json(VALIDATOR_PREFIX)
    }

    fn validator(&self, operator: &ValidatorAddress) -> Result<Option<ValidatorRecord>, AppError> {
        self.store
            .get_json(&key(VALIDATOR_PREFIX, operator.as_bytes()))
    }

    fn set_validator_signing_info(
        &mut self,
        _ctx: &BlockContext,
        info: ValidatorSigningInfo,
    ) -> Result<(), AppError> {
        self.ensure_initialized()?;
        self.check_failure(Phase::SigningInfo)?;
        let known = self
            .validators()?
            .iter()
            .any(|v| v.consensus_address() == info.address);
        if !known {
            return Err(AppError::UnknownValidator(info.address.to_string()));
        }
        self.store
            .set_json(key(SIGNING_INFO_PREFIX, info.address.as_bytes()), &info)
    }

    fn validator_signing_info(
        &self,
        address: &ConsensusAddress,
    ) -> Result<Option<ValidatorSigningInfo>, AppError> {
        self.store
            .get_json(&key(SIGNING_INFO_PREFIX, address.as_bytes()))
    }

    /// Mint `coins` into `address`. Balance and supply saturate at
    /// `u64::MAX`.
    fn fund_account(
        &mut self,
        _ctx: &BlockContext,
        address: &AccountAddress,
        coins: &Coins,
    ) -> Result<(), AppError> {
        self.ensure_initialized()?;
        self.check_failure(Phase::Funding)?;
        coins.validate()?;

        let mut balance = self.balances(address)?;
        balance.add(coins);
        self.set_balances(address, &balance)?;

        let mut supply = self.supply()?;
        supply.add(coins);
        self.store.set_json(SUPPLY_KEY, &supply)?;

        self.ensure_account(address)
    }

    fn balance(&self, address: &AccountAddress, denom: &str) -> Result<u64, AppError> {
        Ok(self.balances(address)?.amount_of(denom))
    }

    fn last_app_hash(&self) -> Hash {
        self.last_app_hash
    }
}

impl MemApp {
    /// Build a transfer transaction between two accounts
    pub fn transfer_tx(
        from: AccountAddress,
        to: AccountAddress,
        amount: Coin,
    ) -> Result<Tx, AppError> {
        Ok(AppTx::transfer(from, to, amount.into()).encode()?)
    }
}
