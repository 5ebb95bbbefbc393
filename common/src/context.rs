use serde::{Deserialize, Serialize};

use crate::{
    abci::VoteInfo,
    crypto::ConsensusAddress,
    time::{add_seconds, TimestampMillis, TimestampSeconds},
};

/// Execution context of the block currently being built or last committed.
///
/// Contexts are values: advancing to the next block produces a new context
/// and leaves the previous one untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockContext {
    pub chain_id: String,
    pub height: u64,
    pub time: TimestampMillis,
    pub proposer: Option<ConsensusAddress>,
    pub vote_infos: Vec<VoteInfo>,
}

impl BlockContext {
    pub fn genesis(chain_id: impl Into<String>, time: TimestampMillis) -> Self {
        Self {
            chain_id: chain_id.into(),
            height: 0,
            time,
            proposer: None,
            vote_infos: Vec::new(),
        }
    }

    /// Context of the next block: height + 1, time + `seconds`.
    pub fn next(&self, seconds: TimestampSeconds) -> Self {
        Self {
            chain_id: self.chain_id.clone(),
            height: self.height + 1,
            time: add_seconds(self.time, seconds),
            proposer: None,
            vote_infos: Vec::new(),
        }
    }

    pub fn with_proposer(mut self, proposer: ConsensusAddress, vote_infos: Vec<VoteInfo>) -> Self {
        self.proposer = Some(proposer);
        self.vote_infos = vote_infos;
        self
    }

    pub fn is_genesis(&self) -> bool {
        self.height == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_advances_height_and_time() {
        let genesis = BlockContext::genesis("blocksim-1", 10_000);
        let next = genesis.next(5);
        assert!(genesis.is_genesis());
        assert_eq!(next.height, 1);
        assert_eq!(next.time, 15_000);
        assert_eq!(next.chain_id, "blocksim-1");
        assert!(!next.is_genesis());
    }

    #[test]
    fn test_next_drops_vote_infos() {
        let proposer = ConsensusAddress::new([1; 20]);
        let ctx = BlockContext::genesis("c", 0).with_proposer(proposer, Vec::new());
        assert_eq!(ctx.proposer, Some(proposer));
        assert_eq!(ctx.next(0).proposer, None);
    }
}
