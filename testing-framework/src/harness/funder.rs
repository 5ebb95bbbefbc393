// File: testing-framework/src/harness/funder.rs
//
// Validator funding
//
// Credits every validator account with a large balance so test
// transactions never fail for lack of funds. Each round is additive; the
// credited balance saturates at u64::MAX instead of wrapping.

use blocksim_common::{
    crypto::{AccountAddress, ValidatorKey},
    Application, BlockContext, Coin, Coins,
};

use super::error::HarnessError;

pub struct ValidatorFunder {
    denom: String,
    amount: u64,
}

impl ValidatorFunder {
    pub fn new(denom: impl Into<String>, amount: u64) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }

    pub fn denom(&self) -> &str {
        &self.denom
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    /// Coins credited per account on each round
    pub fn coins(&self) -> Coins {
        Coins::from(Coin::new(self.amount, self.denom.clone()))
    }

    /// Credit the account of every key in `keys`, stopping at the first
    /// failure.
    pub fn fund<A: Application>(
        &self,
        app: &mut A,
        ctx: &BlockContext,
        keys: &[ValidatorKey],
    ) -> Result<(), HarnessError> {
        let coins = self.coins();
        for key in keys {
            fund_account(app, ctx, &key.account_address(), &coins)?;
        }
        log::debug!(
            "Funded {} validator account(s) with {} at height {}",
            keys.len(),
            coins,
            ctx.height
        );
        Ok(())
    }
}

pub(crate) fn fund_account<A: Application>(
    app: &mut A,
    ctx: &BlockContext,
    address: &AccountAddress,
    coins: &Coins,
) -> Result<(), HarnessError> {
    app.fund_account(ctx, address, coins)
        .map_err(|source| HarnessError::Funding {
            address: address.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use blocksim_common::config::VALIDATOR_FUND_AMOUNT;

    #[test]
    fn test_coins() {
        let funder = ValidatorFunder::new("ublk", VALIDATOR_FUND_AMOUNT);
        let coins = funder.coins();
        assert_eq!(coins.len(), 1);
        assert_eq!(coins.amount_of("ublk"), 9_223_372_036_854_775_807);
        assert_eq!(funder.denom(), "ublk");
    }
}
