//! Request and response types of the block-execution contract between a
//! consensus driver and an application.
//!
//! The shapes follow the ABCI 2.0 lifecycle: `InitChain` once, then per
//! block `PrepareProposal`, `ProcessProposal`, `FinalizeBlock` and `Commit`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{
    config::{BLOCK_MAX_BYTES, BLOCK_MAX_GAS_FIXED, BLOCK_MAX_GAS_UNLIMITED},
    crypto::{ConsensusAddress, Hash, PublicKey},
    time::TimestampMillis,
};

/// Opaque transaction bytes.
pub type Tx = Vec<u8>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockParams {
    pub max_bytes: i64,
    // -1 disables the gas ceiling
    pub max_gas: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusParams {
    pub block: BlockParams,
}

impl ConsensusParams {
    pub fn unlimited_gas() -> Self {
        Self {
            block: BlockParams {
                max_bytes: BLOCK_MAX_BYTES,
                max_gas: BLOCK_MAX_GAS_UNLIMITED,
            },
        }
    }

    pub fn fixed_gas() -> Self {
        Self {
            block: BlockParams {
                max_bytes: BLOCK_MAX_BYTES,
                max_gas: BLOCK_MAX_GAS_FIXED,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorUpdate {
    pub pub_key: PublicKey,
    pub power: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestInitChain {
    pub chain_id: String,
    pub time: TimestampMillis,
    pub consensus_params: ConsensusParams,
    pub validators: Vec<ValidatorUpdate>,
    pub app_state_bytes: Vec<u8>,
    pub initial_height: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseInitChain {
    pub validators: Vec<ValidatorUpdate>,
    pub app_hash: Hash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockIdFlag {
    Unknown,
    Absent,
    Commit,
    Nil,
}

/// Attribution of a vote to a validator for the block being built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteInfo {
    pub validator: ConsensusAddress,
    pub power: i64,
    pub block_id_flag: BlockIdFlag,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPrepareProposal {
    pub max_tx_bytes: i64,
    pub txs: Vec<Tx>,
    pub height: u64,
    pub time: TimestampMillis,
    pub proposer: Option<ConsensusAddress>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponsePrepareProposal {
    pub txs: Vec<Tx>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestProcessProposal {
    pub txs: Vec<Tx>,
    pub height: u64,
    pub time: TimestampMillis,
    pub proposer: Option<ConsensusAddress>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalStatus {
    Unknown,
    Accept,
    Reject,
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProposalStatus::Unknown => "UNKNOWN",
            ProposalStatus::Accept => "ACCEPT",
            ProposalStatus::Reject => "REJECT",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseProcessProposal {
    pub status: ProposalStatus,
}

impl ResponseProcessProposal {
    pub fn is_accepted(&self) -> bool {
        self.status == ProposalStatus::Accept
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFinalizeBlock {
    pub txs: Vec<Tx>,
    pub height: u64,
    pub time: TimestampMillis,
    pub proposer: Option<ConsensusAddress>,
    pub decided_last_commit: Vec<VoteInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventAttribute {
    pub key: String,
    pub value: String,
    pub index: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub kind: String,
    pub attributes: Vec<EventAttribute>,
}

impl Event {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(EventAttribute {
            key: key.into(),
            value: value.into(),
            index: true,
        });
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.key == key)
            .map(|a| a.value.as_str())
    }
}

/// Result of executing a single transaction inside `FinalizeBlock`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecTxResult {
    pub code: u32,
    pub data: Vec<u8>,
    pub log: String,
    pub info: String,
    pub gas_wanted: i64,
    pub gas_used: i64,
    pub events: Vec<Event>,
    pub codespace: String,
}

impl ExecTxResult {
    pub fn is_ok(&self) -> bool {
        self.code == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseFinalizeBlock {
    pub events: Vec<Event>,
    pub tx_results: Vec<ExecTxResult>,
    pub validator_updates: Vec<ValidatorUpdate>,
    pub app_hash: Hash,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResponseCommit {
    pub retain_height: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consensus_params_modes() {
        assert_eq!(ConsensusParams::unlimited_gas().block.max_gas, -1);
        assert_eq!(ConsensusParams::fixed_gas().block.max_gas, 300_000_000);
        assert_eq!(
            ConsensusParams::fixed_gas().block.max_bytes,
            ConsensusParams::unlimited_gas().block.max_bytes
        );
    }

    #[test]
    fn test_event_attributes() {
        let event = Event::new("transfer")
            .with_attribute("amount", "10ublk")
            .with_attribute("sender", "alice");
        assert_eq!(event.attribute("amount"), Some("10ublk"));
        assert_eq!(event.attribute("missing"), None);
    }

    #[test]
    fn test_process_proposal_accept() {
        let accepted = ResponseProcessProposal {
            status: ProposalStatus::Accept,
        };
        let rejected = ResponseProcessProposal {
            status: ProposalStatus::Reject,
        };
        assert!(accepted.is_accepted());
        assert!(!rejected.is_accepted());
        assert_eq!(rejected.status.to_string(), "REJECT");
    }
}
