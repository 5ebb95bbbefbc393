use blocksim_common::{
    config::{BANK_MODULE, BONDED_POOL_NAME, STAKING_MODULE},
    crypto::{AccountAddress, Hash},
};
use std::collections::HashSet;

use crate::{
    document::GenesisDocument,
    error::GenesisError,
    types::{BankGenesis, StakingGenesis},
};

/// Validate the cross-module invariants of a genesis document and return its
/// state hash.
///
/// - staking has at least one validator
/// - every delegation points at a known validator
/// - all coin denominations are valid
/// - declared supply equals the sum of all balances, per denomination
/// - the bonded pool holds exactly the tokens of the bonded validators
pub fn validate_genesis(doc: &GenesisDocument) -> Result<Hash, GenesisError> {
    let staking: StakingGenesis = doc.module(STAKING_MODULE)?;
    let bank: BankGenesis = doc.module(BANK_MODULE)?;

    if staking.validators.is_empty() {
        return Err(GenesisError::EmptyValidatorSet);
    }

    validate_delegations(&staking)?;

    for balance in &bank.balances {
        balance.coins.validate()?;
    }
    bank.supply.validate()?;

    validate_supply(&bank)?;
    validate_bonded_pool(&staking, &bank)?;

    let state_hash = doc.state_hash();
    log::debug!("Genesis validated, state hash {}", state_hash);
    Ok(state_hash)
}

fn validate_delegations(staking: &StakingGenesis) -> Result<(), GenesisError> {
    let known: HashSet<_> = staking.validators.iter().map(|v| v.operator_address).collect();
    for delegation in &staking.delegations {
        if !known.contains(&delegation.validator_address) {
            return Err(GenesisError::ValidatorNotFound {
                delegator: delegation.delegator_address.to_string(),
                validator: delegation.validator_address.to_string(),
            });
        }
    }
    Ok(())
}

fn validate_supply(bank: &BankGenesis) -> Result<(), GenesisError> {
    let computed = bank.sum_balances().ok_or(GenesisError::BalanceOverflow)?;

    let mut denoms: Vec<&str> = computed.iter().map(|c| c.denom.as_str()).collect();
    denoms.extend(bank.supply.iter().map(|c| c.denom.as_str()));
    denoms.sort_unstable();
    denoms.dedup();

    for denom in denoms {
        let declared = bank.supply.amount_of(denom);
        let sum = computed.amount_of(denom);
        if declared != sum {
            return Err(GenesisError::SupplyMismatch {
                denom: denom.to_string(),
                declared,
                computed: sum,
            });
        }
    }
    Ok(())
}

fn validate_bonded_pool(staking: &StakingGenesis, bank: &BankGenesis) -> Result<(), GenesisError> {
    let denom = &staking.params.bond_denom;
    let expected = staking.bonded_tokens().ok_or(GenesisError::BalanceOverflow)?;
    let pool = AccountAddress::module(BONDED_POOL_NAME);
    let actual = bank
        .balance_of(&pool)
        .map(|coins| coins.amount_of(denom))
        .unwrap_or(0);

    if expected != actual {
        return Err(GenesisError::BondedPoolMismatch {
            denom: denom.clone(),
            expected,
            actual,
        });
    }
    Ok(())
}
