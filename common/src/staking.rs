use serde::{Deserialize, Serialize};

use crate::{
    config::POWER_REDUCTION,
    crypto::{AccountAddress, ConsensusAddress, PublicKey, ValidatorAddress},
    decimal::Decimal,
    time::TimestampMillis,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BondStatus {
    Unbonded,
    Unbonding,
    Bonded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommissionRates {
    pub rate: Decimal,
    pub max_rate: Decimal,
    pub max_change_rate: Decimal,
}

impl CommissionRates {
    pub fn new(rate: Decimal, max_rate: Decimal, max_change_rate: Decimal) -> Self {
        Self {
            rate,
            max_rate,
            max_change_rate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commission {
    pub rates: CommissionRates,
    pub update_time: TimestampMillis,
}

/// A validator as seen by the staking module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorRecord {
    pub operator_address: ValidatorAddress,
    pub consensus_pubkey: PublicKey,
    pub jailed: bool,
    pub status: BondStatus,
    pub tokens: u64,
    pub delegator_shares: Decimal,
    pub unbonding_height: u64,
    pub unbonding_time: TimestampMillis,
    pub commission: Commission,
    pub min_self_delegation: u64,
}

impl ValidatorRecord {
    pub fn consensus_address(&self) -> ConsensusAddress {
        self.consensus_pubkey.consensus_address()
    }

    /// Consensus power derived from the bonded tokens. Unbonded or jailed
    /// validators carry no power.
    pub fn voting_power(&self) -> i64 {
        if self.jailed || self.status != BondStatus::Bonded {
            return 0;
        }
        (self.tokens / POWER_REDUCTION) as i64
    }

    pub fn is_bonded(&self) -> bool {
        self.status == BondStatus::Bonded
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    pub delegator_address: AccountAddress,
    pub validator_address: ValidatorAddress,
    pub shares: Decimal,
}

/// Liveness bookkeeping kept by the slashing module for each validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorSigningInfo {
    pub address: ConsensusAddress,
    pub start_height: u64,
    pub index_offset: u64,
    pub jailed_until: TimestampMillis,
    pub tombstoned: bool,
    pub missed_blocks_counter: u64,
}

impl ValidatorSigningInfo {
    /// Fresh record: nothing missed, never jailed.
    pub fn new(address: ConsensusAddress, start_height: u64) -> Self {
        Self {
            address,
            start_height,
            index_offset: 0,
            jailed_until: 0,
            tombstoned: false,
            missed_blocks_counter: 0,
        }
    }

    pub fn is_jailed_at(&self, time: TimestampMillis) -> bool {
        self.jailed_until > time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(tokens: u64, status: BondStatus, jailed: bool) -> ValidatorRecord {
        ValidatorRecord {
            operator_address: ValidatorAddress::new([2; 20]),
            consensus_pubkey: PublicKey::from_bytes([3; 32]),
            jailed,
            status,
            tokens,
            delegator_shares: Decimal::one(),
            unbonding_height: 0,
            unbonding_time: 0,
            commission: Commission {
                rates: CommissionRates::default(),
                update_time: 0,
            },
            min_self_delegation: 0,
        }
    }

    #[test]
    fn test_voting_power() {
        assert_eq!(record(POWER_REDUCTION, BondStatus::Bonded, false).voting_power(), 1);
        assert_eq!(record(5 * POWER_REDUCTION, BondStatus::Bonded, false).voting_power(), 5);
        assert_eq!(record(POWER_REDUCTION, BondStatus::Bonded, true).voting_power(), 0);
        assert_eq!(record(POWER_REDUCTION, BondStatus::Unbonded, false).voting_power(), 0);
    }

    #[test]
    fn test_signing_info_new() {
        let info = ValidatorSigningInfo::new(ConsensusAddress::new([1; 20]), 7);
        assert_eq!(info.start_height, 7);
        assert_eq!(info.missed_blocks_counter, 0);
        assert!(!info.tombstoned);
        assert!(!info.is_jailed_at(0));
    }
}
