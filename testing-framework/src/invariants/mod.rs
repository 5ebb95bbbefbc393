//! Core invariant checkers
//!
//! - Supply conservation: declared supply equals the sum of all balances
//! - Block progression: one block moves height by one and time by the
//!   requested increment
//! - State preservation: a rejected block leaves height, time and the
//!   application hash untouched

use anyhow::{bail, Result};
use blocksim_common::{
    crypto::Hash,
    time::{add_seconds, TimestampMillis, TimestampSeconds},
    Application, BlockContext,
};

use crate::{app::MemApp, harness::ChainHarness};

/// Check supply conservation for every denomination
pub fn check_supply_conservation(app: &MemApp) -> Result<()> {
    let supply = app.supply()?;
    let balances = app.total_balances()?;

    for coin in supply.iter().chain(balances.iter()) {
        let declared = supply.amount_of(&coin.denom);
        let held = balances.amount_of(&coin.denom);
        if declared != held {
            bail!(
                "Supply of {} is {} but balances sum to {}",
                coin.denom,
                declared,
                held
            );
        }
    }
    Ok(())
}

/// Check that `after` is the block directly following `before`
pub fn check_block_progression(
    before: &BlockContext,
    after: &BlockContext,
    seconds: TimestampSeconds,
) -> Result<()> {
    if after.height != before.height + 1 {
        bail!(
            "Height moved from {} to {}, expected {}",
            before.height,
            after.height,
            before.height + 1
        );
    }
    let expected = add_seconds(before.time, seconds);
    if after.time != expected {
        bail!(
            "Block time moved from {} to {}, expected {}",
            before.time,
            after.time,
            expected
        );
    }
    Ok(())
}

/// Height, time and application hash at one point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateSnapshot {
    pub height: u64,
    pub time: TimestampMillis,
    pub app_hash: Hash,
}

impl StateSnapshot {
    pub fn capture<A: Application>(harness: &ChainHarness<A>) -> Self {
        Self {
            height: harness.height(),
            time: harness.block_time(),
            app_hash: harness.app().last_app_hash(),
        }
    }
}

/// Check that nothing was committed between two snapshots
pub fn check_state_unchanged(before: &StateSnapshot, after: &StateSnapshot) -> Result<()> {
    if before != after {
        bail!(
            "State changed: height {} -> {}, time {} -> {}, app hash {} -> {}",
            before.height,
            after.height,
            before.time,
            after.time,
            before.app_hash,
            after.app_hash
        );
    }
    Ok(())
}
