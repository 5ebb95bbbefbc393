use blocksim_common::{
    config::{BANK_MODULE, POWER_REDUCTION, STAKING_MODULE},
    crypto::{AccountAddress, ValidatorAddress},
    staking::Delegation,
    Coin, Decimal,
};
use blocksim_genesis::{
    types::{default_app_genesis, Balance, BankGenesis, StakingGenesis},
    validate_genesis, GenesisBuilder, GenesisConfig, GenesisDocument, GenesisError,
};
use proptest::prelude::*;
use rand::{rngs::StdRng, SeedableRng};

fn built_document() -> GenesisDocument {
    let mut rng = StdRng::seed_from_u64(7);
    let (doc, _) = GenesisBuilder::new(GenesisConfig::default())
        .build_from_defaults(default_app_genesis().unwrap(), &mut rng)
        .unwrap();
    doc
}

#[test]
fn test_built_document_is_valid() {
    let doc = built_document();
    let hash = validate_genesis(&doc).unwrap();
    assert_eq!(hash, doc.state_hash());
}

#[test]
fn test_dangling_delegation_is_rejected() {
    let mut doc = built_document();
    let mut staking: StakingGenesis = doc.module(STAKING_MODULE).unwrap();
    let unknown = ValidatorAddress::new([0xee; 20]);
    staking.delegations.push(Delegation {
        delegator_address: AccountAddress::new([1; 20]),
        validator_address: unknown,
        shares: Decimal::one(),
    });
    doc.insert(STAKING_MODULE, &staking).unwrap();

    match validate_genesis(&doc) {
        Err(GenesisError::ValidatorNotFound { validator, .. }) => {
            assert_eq!(validator, unknown.to_string());
        }
        other => panic!("expected ValidatorNotFound, got {:?}", other),
    }
}

#[test]
fn test_supply_mismatch_is_rejected() {
    let mut doc = built_document();
    let mut bank: BankGenesis = doc.module(BANK_MODULE).unwrap();
    bank.balances.push(Balance {
        address: AccountAddress::new([3; 20]),
        coins: Coin::new(5, "ublk").into(),
    });
    doc.insert(BANK_MODULE, &bank).unwrap();

    match validate_genesis(&doc) {
        Err(GenesisError::SupplyMismatch {
            denom,
            declared,
            computed,
        }) => {
            assert_eq!(denom, "ublk");
            assert_eq!(computed, declared + 5);
        }
        other => panic!("expected SupplyMismatch, got {:?}", other),
    }
}

#[test]
fn test_bonded_pool_mismatch_is_rejected() {
    let mut doc = built_document();
    let mut staking: StakingGenesis = doc.module(STAKING_MODULE).unwrap();
    staking.validators[0].tokens *= 2;
    doc.insert(STAKING_MODULE, &staking).unwrap();

    assert!(matches!(
        validate_genesis(&doc),
        Err(GenesisError::BondedPoolMismatch { .. })
    ));
}

#[test]
fn test_missing_bank_module() {
    let mut modules = default_app_genesis().unwrap();
    modules.shift_remove(BANK_MODULE);
    let doc = GenesisDocument::from(modules);
    assert!(matches!(
        validate_genesis(&doc),
        Err(GenesisError::MissingModule(m)) if m == BANK_MODULE
    ));
}

proptest! {
    #[test]
    fn prop_supply_invariant_holds(amounts in proptest::collection::vec(1u64..1_000_000_000, 0..8)) {
        let extra_balances: Vec<Balance> = amounts
            .iter()
            .enumerate()
            .map(|(i, amount)| Balance {
                address: AccountAddress::new([i as u8 + 1; 20]),
                coins: Coin::new(*amount, "ublk").into(),
            })
            .collect();
        let config = GenesisConfig {
            extra_balances,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(11);
        let (doc, _) = GenesisBuilder::new(config)
            .build_from_defaults(default_app_genesis().unwrap(), &mut rng)
            .unwrap();

        let bank: BankGenesis = doc.module(BANK_MODULE).unwrap();
        prop_assert_eq!(
            bank.supply.amount_of("ublk"),
            amounts.iter().sum::<u64>() + POWER_REDUCTION
        );
        prop_assert!(validate_genesis(&doc).is_ok());
    }
}
