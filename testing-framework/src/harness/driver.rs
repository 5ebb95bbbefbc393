// File: testing-framework/src/harness/driver.rs
//
// Block-cycle driver
//
// Sequences BeginBlock -> Execute* -> EndBlock, where EndBlock runs
// Prepare, Process, Finalize and Commit strictly in that order.

use blocksim_common::{
    abci::{
        BlockIdFlag, RequestFinalizeBlock, RequestPrepareProposal, RequestProcessProposal,
        ResponseFinalizeBlock, Tx, VoteInfo,
    },
    config::{EPOCH_ADVANCE_SECONDS, MAX_PREPARE_TX_BYTES, PROPOSER_VOTE_POWER},
    crypto::ConsensusAddress,
    time::{TimestampMillis, TimestampSeconds},
    AppError, Application, BlockContext,
};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::{HarnessError, Phase};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverState {
    /// No block open: before the first block or after a commit.
    Idle,
    /// A block is open and accepts transactions.
    Accumulating,
    /// A cycle failed; nothing more can be driven.
    Halted,
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DriverState::Idle => "idle",
            DriverState::Accumulating => "accumulating",
            DriverState::Halted => "halted",
        };
        f.write_str(s)
    }
}

/// Transactions queued for the block being built, with its target height
/// and time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingBlock {
    txs: Vec<Tx>,
    height: u64,
    time: TimestampMillis,
}

impl PendingBlock {
    pub fn new(height: u64, time: TimestampMillis) -> Self {
        Self {
            txs: Vec::new(),
            height,
            time,
        }
    }

    pub fn push(&mut self, tx: Tx) {
        self.txs.push(tx);
    }

    pub fn txs(&self) -> &[Tx] {
        &self.txs
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn time(&self) -> TimestampMillis {
        self.time
    }

    pub fn len(&self) -> usize {
        self.txs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.txs.is_empty()
    }

    /// Total size of the queued transactions in bytes.
    pub fn size(&self) -> usize {
        self.txs.iter().map(Vec::len).sum()
    }
}

pub struct BlockCycleDriver {
    state: DriverState,
    pending: Option<PendingBlock>,
}

impl BlockCycleDriver {
    pub fn new() -> Self {
        Self {
            state: DriverState::Idle,
            pending: None,
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn pending(&self) -> Option<&PendingBlock> {
        self.pending.as_ref()
    }

    pub fn ensure_not_halted(&self) -> Result<(), HarnessError> {
        match self.state {
            DriverState::Halted => Err(HarnessError::Halted),
            _ => Ok(()),
        }
    }

    fn ensure_state(
        &self,
        expected: DriverState,
        operation: &'static str,
    ) -> Result<(), HarnessError> {
        self.ensure_not_halted()?;
        if self.state != expected {
            return Err(HarnessError::InvalidPhase {
                operation,
                state: self.state,
            });
        }
        Ok(())
    }

    fn halt(&mut self, phase: Phase, source: AppError) -> HarnessError {
        log::warn!("Block cycle halted during {}: {}", phase, source);
        self.state = DriverState::Halted;
        self.pending = None;
        HarnessError::app(phase, source)
    }

    /// Open the next block: height + 1, time + `seconds` (exactly one second
    /// when `advance_epoch` is set), then run the application's begin-block
    /// hook under the new context.
    pub fn begin<A: Application>(
        &mut self,
        app: &mut A,
        ctx: &mut BlockContext,
        advance_epoch: bool,
        seconds: TimestampSeconds,
        proposer: Option<ConsensusAddress>,
    ) -> Result<(), HarnessError> {
        self.ensure_state(DriverState::Idle, "begin a block")?;

        let increment = if advance_epoch {
            EPOCH_ADVANCE_SECONDS
        } else {
            seconds
        };

        let mut next = ctx.next(increment);
        if let Some(proposer) = proposer {
            let votes = vec![VoteInfo {
                validator: proposer,
                power: PROPOSER_VOTE_POWER,
                block_id_flag: BlockIdFlag::Commit,
            }];
            next = next.with_proposer(proposer, votes);
        }

        log::debug!(
            "BeginBlock height={} time={} (+{}s{}) proposer={:?}",
            next.height,
            next.time,
            increment,
            if advance_epoch { ", epoch" } else { "" },
            next.proposer
        );

        if let Err(source) = app.begin_block(&next) {
            return Err(self.halt(Phase::BeginBlock, source));
        }

        self.pending = Some(PendingBlock::new(next.height, next.time));
        *ctx = next;
        self.state = DriverState::Accumulating;
        Ok(())
    }

    /// Queue a transaction into the open block, preserving insertion order.
    pub fn push(&mut self, tx: Tx) -> Result<(), HarnessError> {
        self.ensure_state(DriverState::Accumulating, "execute a transaction")?;
        match self.pending.as_mut() {
            Some(pending) => {
                log::trace!("Queued tx #{} ({} bytes)", pending.len(), tx.len());
                pending.push(tx);
                Ok(())
            }
            None => Err(HarnessError::InvalidPhase {
                operation: "execute a transaction",
                state: self.state,
            }),
        }
    }

    /// Close the open block: Prepare, Process, Finalize, Commit.
    ///
    /// Finalize receives the queued transactions, not the prepared set. A
    /// proposal that is not accepted halts the driver before anything is
    /// finalized or committed.
    pub fn end<A: Application>(
        &mut self,
        app: &mut A,
        ctx: &BlockContext,
    ) -> Result<ResponseFinalizeBlock, HarnessError> {
        self.ensure_state(DriverState::Accumulating, "end a block")?;
        let pending = match self.pending.take() {
            Some(pending) => pending,
            None => {
                return Err(HarnessError::InvalidPhase {
                    operation: "end a block",
                    state: self.state,
                })
            }
        };

        let height = pending.height();
        let time = pending.time();

        log::debug!(
            "PrepareProposal height={} txs={} bytes={}",
            height,
            pending.len(),
            pending.size()
        );
        let prepared = match app.prepare_proposal(RequestPrepareProposal {
            max_tx_bytes: MAX_PREPARE_TX_BYTES,
            txs: pending.txs().to_vec(),
            height,
            time,
            proposer: ctx.proposer,
        }) {
            Ok(response) => response,
            Err(source) => return Err(self.halt(Phase::Prepare, source)),
        };

        log::debug!("ProcessProposal height={} txs={}", height, prepared.txs.len());
        let processed = match app.process_proposal(RequestProcessProposal {
            txs: prepared.txs,
            height,
            time,
            proposer: ctx.proposer,
        }) {
            Ok(response) => response,
            Err(source) => return Err(self.halt(Phase::Process, source)),
        };

        if !processed.is_accepted() {
            log::warn!(
                "Proposal at height {} not accepted ({}), halting",
                height,
                processed.status
            );
            self.state = DriverState::Halted;
            return Err(HarnessError::ProposalRejected {
                height,
                status: processed.status,
            });
        }

        let txs = pending.txs;
        log::debug!("FinalizeBlock height={} txs={}", height, txs.len());
        let response = match app.finalize_block(RequestFinalizeBlock {
            txs,
            height,
            time,
            proposer: ctx.proposer,
            decided_last_commit: ctx.vote_infos.clone(),
        }) {
            Ok(response) => response,
            Err(source) => return Err(self.halt(Phase::Finalize, source)),
        };

        if let Err(source) = app.commit() {
            return Err(self.halt(Phase::Commit, source));
        }

        log::debug!(
            "Committed height={} app_hash={}",
            height,
            app.last_app_hash()
        );

        self.state = DriverState::Idle;
        Ok(response)
    }
}

impl Default for BlockCycleDriver {
    fn default() -> Self {
        Self::new()
    }
}
