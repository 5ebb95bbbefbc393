#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

// Block-cycle behavior of ChainHarness driven against MemApp

use blocksim_common::{
    abci::BlockIdFlag,
    config::{MAX_PREPARE_TX_BYTES, PROPOSER_VOTE_POWER},
    staking::CommissionRates,
    Decimal,
};
use blocksim_genesis::types::{MintParams, RewardsParams};
use blocksim_testing_framework::prelude::*;
use serde_json::json;

const GENESIS_TIME: u64 = 1_700_000_000_000;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn builder() -> HarnessBuilder {
    init_logger();
    HarnessBuilder::new()
        .with_seed(42)
        .with_genesis_time(GENESIS_TIME)
}

fn harness() -> ChainHarness<MemApp> {
    builder().build::<MemApp>().unwrap()
}

#[test]
fn test_init_starts_at_genesis() {
    let harness = harness();

    assert_eq!(harness.height(), 0);
    assert_eq!(harness.block_time(), GENESIS_TIME);
    assert_eq!(harness.genesis_time(), GENESIS_TIME);
    assert_eq!(harness.chain_id(), "blocksim-1");
    assert_eq!(harness.state(), DriverState::Idle);
    assert!(harness.pending().is_none());
    assert!(harness.node_home().unwrap().exists());

    let app = harness.app();
    assert!(app.is_initialized());
    assert!(app.trace_enabled());
    assert_eq!(app.simulation_gas_limit(), Some(u64::MAX));
    assert_eq!(app.consensus_params().unwrap().block.max_gas, 300_000_000);
    assert_eq!(app.committed_height(), 0);
}

#[test]
fn test_signing_info_seeded_for_genesis_validator() {
    let harness = harness();
    let consensus = harness.validator_key().consensus_address();

    let info = harness
        .app()
        .validator_signing_info(&consensus)
        .unwrap()
        .unwrap();
    assert_eq!(info.start_height, 0);
    assert_eq!(info.missed_blocks_counter, 0);
    assert!(!info.tombstoned);
}

#[test]
fn test_validator_addresses_single_entry() {
    let harness = harness();
    let addresses = harness.validator_addresses().unwrap();
    assert_eq!(addresses, vec![harness.validator_key().operator_address()]);
}

#[test]
fn test_single_tx_block() {
    let mut harness = harness();

    harness.begin_block(false, 5).unwrap();
    assert_eq!(harness.state(), DriverState::Accumulating);
    harness.execute(b"txA".to_vec()).unwrap();
    assert_eq!(harness.pending().unwrap().len(), 1);

    let response = harness.end_block().unwrap();
    assert_eq!(response.tx_results.len(), 1);
    assert!(response.tx_results[0].is_ok());
    assert_eq!(harness.height(), 1);
    assert_eq!(harness.block_time(), GENESIS_TIME + 5_000);
    assert_eq!(harness.state(), DriverState::Idle);
    assert_eq!(harness.app().committed_height(), 1);
    assert_eq!(response.app_hash, harness.app().last_app_hash());
}

#[test]
fn test_empty_block_advances_height_and_time() {
    let mut harness = harness();

    let before = harness.context().clone();
    harness.begin_block(false, 30).unwrap();
    let response = harness.end_block().unwrap();
    assert!(response.tx_results.is_empty());
    check_block_progression(&before, harness.context(), 30).unwrap();
}

#[test]
fn test_epoch_advance_forces_one_second() {
    let mut harness = harness();

    harness.begin_block(true, 600).unwrap();
    harness.end_block().unwrap();
    assert_eq!(harness.height(), 1);
    assert_eq!(harness.block_time(), GENESIS_TIME + 1_000);
}

#[test]
fn test_tx_order_reaches_prepare() {
    let mut harness = harness();

    let txs = vec![b"t1".to_vec(), b"t2".to_vec(), b"t3".to_vec()];
    harness.begin_block(false, 5).unwrap();
    for tx in &txs {
        harness.execute(tx.clone()).unwrap();
    }
    let response = harness.end_block().unwrap();

    let prepare = harness.app().last_prepare_request().unwrap();
    assert_eq!(prepare.txs, txs);
    assert_eq!(prepare.max_tx_bytes, MAX_PREPARE_TX_BYTES);
    assert_eq!(prepare.height, 1);
    assert_eq!(harness.app().last_finalize_request().unwrap().txs, txs);
    assert_eq!(response.tx_results.len(), 3);
}

#[test]
fn test_finalize_receives_queued_txs_not_prepared_set() {
    let mut harness = harness();

    // Two transactions that do not both fit into the prepare byte budget
    let big = vec![7u8; 6_000_000];
    harness.begin_block(false, 5).unwrap();
    harness.execute(big.clone()).unwrap();
    harness.execute(big).unwrap();
    let response = harness.end_block().unwrap();

    assert_eq!(harness.app().last_process_request().unwrap().txs.len(), 1);
    assert_eq!(harness.app().last_finalize_request().unwrap().txs.len(), 2);
    assert_eq!(response.tx_results.len(), 2);
}

#[test]
fn test_rejected_proposal_halts_without_commit() {
    let mut harness = harness();
    harness.skip_block().unwrap();

    harness.app_mut().reject_next_proposal();
    harness.begin_block(false, 5).unwrap();
    harness.execute(b"txB".to_vec()).unwrap();
    let before = StateSnapshot::capture(&harness);

    let err = harness.end_block().unwrap_err();
    assert!(err.is_rejection());
    assert!(matches!(
        err,
        HarnessError::ProposalRejected {
            height: 2,
            status: ProposalStatus::Reject
        }
    ));

    let after = StateSnapshot::capture(&harness);
    check_state_unchanged(&before, &after).unwrap();
    assert_eq!(harness.app().committed_height(), 1);
    assert_eq!(harness.app().last_finalize_request().unwrap().height, 1);
    assert_eq!(harness.state(), DriverState::Halted);
    assert!(harness.pending().is_none());
}

#[test]
fn test_halted_harness_refuses_further_blocks() {
    let mut harness = harness();
    harness.app_mut().set_proposal_verdict(ProposalStatus::Unknown);

    harness.begin_block(false, 5).unwrap();
    let err = harness.end_block().unwrap_err();
    assert!(matches!(
        err,
        HarnessError::ProposalRejected {
            status: ProposalStatus::Unknown,
            ..
        }
    ));

    assert!(matches!(
        harness.begin_block(false, 5),
        Err(HarnessError::Halted)
    ));
    assert!(matches!(
        harness.execute(b"late".to_vec()),
        Err(HarnessError::Halted)
    ));
    assert!(matches!(harness.fund_validators(), Err(HarnessError::Halted)));
    assert!(matches!(harness.skip_block(), Err(HarnessError::Halted)));
    assert_eq!(harness.height(), 1);
}

#[test]
fn test_misuse_is_reported_without_halting() {
    let mut harness = harness();

    let err = harness.execute(b"early".to_vec()).unwrap_err();
    assert!(err.is_misuse());
    assert!(matches!(
        err,
        HarnessError::InvalidPhase {
            state: DriverState::Idle,
            ..
        }
    ));
    assert!(matches!(
        harness.end_block(),
        Err(HarnessError::InvalidPhase { .. })
    ));

    harness.begin_block(false, 5).unwrap();
    assert!(matches!(
        harness.begin_block(false, 5),
        Err(HarnessError::InvalidPhase {
            state: DriverState::Accumulating,
            ..
        })
    ));
    assert_eq!(harness.state(), DriverState::Accumulating);

    harness.end_block().unwrap();
    assert_eq!(harness.height(), 1);
}

#[test]
fn test_begin_block_hook_failure_halts() {
    let mut harness = harness();
    harness.app_mut().inject_failure(Phase::BeginBlock);

    let err = harness.begin_block(false, 5).unwrap_err();
    assert!(err.is_fatal());
    assert!(matches!(
        err,
        HarnessError::Application {
            phase: Phase::BeginBlock,
            ..
        }
    ));
    assert_eq!(harness.state(), DriverState::Halted);
    assert_eq!(harness.height(), 0);
    assert_eq!(harness.block_time(), GENESIS_TIME);
}

#[test]
fn test_commit_failure_halts() {
    let mut harness = harness();
    harness.app_mut().inject_failure(Phase::Commit);

    harness.begin_block(false, 5).unwrap();
    let err = harness.end_block().unwrap_err();
    assert!(matches!(
        err,
        HarnessError::Application {
            phase: Phase::Commit,
            ..
        }
    ));
    assert_eq!(harness.state(), DriverState::Halted);
    assert_eq!(harness.app().committed_height(), 0);
}

#[test]
fn test_fund_validators_is_additive() {
    let mut harness = builder().with_fund_amount(1_000).build::<MemApp>().unwrap();
    let before = harness.validator_balance(0).unwrap();

    harness.fund_validators().unwrap();
    harness.fund_validators().unwrap();

    assert_eq!(harness.validator_balance(0).unwrap(), before + 2_000);
    check_supply_conservation(harness.app()).unwrap();
}

#[test]
fn test_default_fund_amount_twice() {
    let mut harness = harness();

    harness.fund_validators().unwrap();
    harness.fund_validators().unwrap();

    let expected = (i64::MAX as u64) * 2;
    assert_eq!(harness.validator_balance(0).unwrap(), expected);
}

#[test]
fn test_fund_validators_saturates() {
    let mut harness = builder()
        .with_fund_amount(u64::MAX)
        .build::<MemApp>()
        .unwrap();

    harness.fund_validators().unwrap();
    harness.fund_validators().unwrap();
    assert_eq!(harness.validator_balance(0).unwrap(), u64::MAX);
}

#[test]
fn test_funding_failure_is_reported() {
    let mut harness = harness();
    harness.app_mut().inject_failure(Phase::Funding);

    let err = harness.fund_validators().unwrap_err();
    assert!(matches!(err, HarnessError::Funding { .. }));
    assert!(err.is_fatal());
    assert_eq!(harness.validator_balance(0).unwrap(), 0);
}

#[test]
fn test_custom_denom_threaded_through_modules() {
    let mut harness = builder().with_bond_denom("uatom").build::<MemApp>().unwrap();
    let app = harness.app();

    let staking = app.module_state("staking").unwrap().unwrap();
    assert_eq!(staking["params"]["bond_denom"], json!("uatom"));
    let mint = app.module_state("mint").unwrap().unwrap();
    assert_eq!(mint["params"]["mint_denom"], json!("uatom"));
    assert!(app.supply().unwrap().amount_of("uatom") > 0);
    assert_eq!(app.supply().unwrap().amount_of("ublk"), 0);

    harness.fund_validators().unwrap();
    let account = harness.validator_key().account_address();
    assert_eq!(harness.balance(&account, "uatom").unwrap(), i64::MAX as u64);
    assert_eq!(harness.balance(&account, "ublk").unwrap(), 0);
}

#[test]
fn test_param_profiles_set_commission() {
    let harness = harness();
    let validators = harness.app().validators().unwrap();
    assert_eq!(validators[0].commission.rates.rate, Decimal::with_prec(5, 2));

    let harness = builder()
        .with_param_profile(ParamProfile::AppDefaults)
        .build::<MemApp>()
        .unwrap();
    let validators = harness.app().validators().unwrap();
    assert_eq!(validators[0].commission.rates, CommissionRates::default());
}

#[test]
fn test_invalid_genesis_override_fails_setup() {
    let result = builder()
        .with_genesis_override("staking", json!({}))
        .build::<MemApp>();

    let err = match result {
        Ok(_) => panic!("harness built with an empty validator set"),
        Err(err) => err,
    };
    assert!(err.is_fatal());
}

#[test]
fn test_default_proposer_gets_commit_vote() {
    let mut harness = harness();
    let consensus = harness.validator_key().consensus_address();

    harness.begin_block(false, 5).unwrap();
    let ctx = harness.context();
    assert_eq!(ctx.proposer, Some(consensus));
    assert_eq!(ctx.vote_infos.len(), 1);
    assert_eq!(ctx.vote_infos[0].power, PROPOSER_VOTE_POWER);
    assert_eq!(ctx.vote_infos[0].block_id_flag, BlockIdFlag::Commit);
    assert_eq!(
        harness.app().current_block().unwrap().proposer,
        Some(consensus)
    );

    harness.end_block().unwrap();
    let finalize = harness.app().last_finalize_request().unwrap();
    assert_eq!(finalize.decided_last_commit.len(), 1);

    let info = harness
        .app()
        .validator_signing_info(&consensus)
        .unwrap()
        .unwrap();
    assert_eq!(info.index_offset, 1);
    assert_eq!(info.missed_blocks_counter, 0);
}

#[test]
fn test_no_proposer_selection() {
    let mut harness = builder()
        .with_proposer(ProposerSelection::None)
        .build::<MemApp>()
        .unwrap();

    harness.begin_block(false, 5).unwrap();
    assert!(harness.context().proposer.is_none());
    assert!(harness.context().vote_infos.is_empty());
    harness.end_block().unwrap();
    assert!(harness
        .app()
        .last_finalize_request()
        .unwrap()
        .decided_last_commit
        .is_empty());
}

#[test]
fn test_round_robin_with_single_validator() {
    let mut harness = builder()
        .with_proposer(ProposerSelection::RoundRobin)
        .build::<MemApp>()
        .unwrap();
    let consensus = harness.validator_key().consensus_address();

    for _ in 0..3 {
        harness.begin_block(false, 5).unwrap();
        assert_eq!(harness.context().proposer, Some(consensus));
        harness.end_block().unwrap();
    }
}

#[test]
fn test_explicit_proposer() {
    let mut harness = harness();
    let operator = harness.validator_key().operator_address();

    harness.begin_block_with_proposer(false, 5, &operator).unwrap();
    assert_eq!(
        harness.context().proposer,
        Some(harness.validator_key().consensus_address())
    );
    harness.end_block().unwrap();
}

#[test]
fn test_unknown_proposer_does_not_halt() {
    let mut harness = harness();
    let stranger = ValidatorAddress::new([9; 20]);

    let err = harness
        .begin_block_with_proposer(false, 5, &stranger)
        .unwrap_err();
    assert!(matches!(err, HarnessError::UnknownValidator(_)));
    assert_eq!(harness.state(), DriverState::Idle);
    assert_eq!(harness.height(), 0);

    let mut fixed = builder()
        .with_proposer(ProposerSelection::Fixed(stranger))
        .build::<MemApp>()
        .unwrap();
    assert!(matches!(
        fixed.begin_block(false, 5),
        Err(HarnessError::UnknownValidator(_))
    ));
    assert_eq!(fixed.state(), DriverState::Idle);
}

#[test]
fn test_param_registry() {
    let harness = harness();
    let registry = harness.param_registry();
    assert!(registry.contains("rewards"));

    let err = harness
        .register_param_set(&RewardsParams::default())
        .unwrap_err();
    assert!(matches!(err, HarnessError::DuplicateParamSet(ref module) if module == "rewards"));

    harness.register_param_set(&MintParams::default()).unwrap();
    assert_eq!(
        harness.param_registry().modules(),
        vec!["rewards".to_string(), "mint".to_string()]
    );
}

#[test]
fn test_skip_blocks_and_increase_time() {
    let mut harness = harness();

    harness.skip_blocks(3).unwrap();
    assert_eq!(harness.height(), 3);
    assert_eq!(harness.block_time(), GENESIS_TIME + 15_000);

    let response = harness.increase_time(3_600).unwrap();
    assert!(response.tx_results.is_empty());
    assert_eq!(harness.height(), 4);
    assert_eq!(harness.block_time(), GENESIS_TIME + 3_615_000);
}

#[test]
fn test_custom_block_time() {
    let mut harness = builder().with_block_time(2).build::<MemApp>().unwrap();
    harness.skip_block().unwrap();
    assert_eq!(harness.block_time(), GENESIS_TIME + 2_000);
}

#[test]
fn test_unlimited_gas_mode() {
    let harness = builder()
        .with_gas_mode(GasMode::Unlimited)
        .with_unlimited_simulation_gas(false)
        .build::<MemApp>()
        .unwrap();
    assert_eq!(harness.app().consensus_params().unwrap().block.max_gas, -1);
    assert_eq!(harness.app().simulation_gas_limit(), None);
}

#[test]
fn test_transfer_between_accounts() {
    let mut harness = builder().with_fund_amount(500).build::<MemApp>().unwrap();
    harness.fund_validators().unwrap();

    let from = harness.validator_key().account_address();
    let to = AccountAddress::module("scenario/bob");
    let ok = MemApp::transfer_tx(from, to, Coin::new(200, "ublk")).unwrap();
    let too_much = MemApp::transfer_tx(from, to, Coin::new(1_000, "ublk")).unwrap();

    harness.begin_block(false, 5).unwrap();
    harness.execute(ok).unwrap();
    harness.execute(too_much).unwrap();
    let response = harness.end_block().unwrap();

    assert!(response.tx_results[0].is_ok());
    assert!(!response.tx_results[1].is_ok());
    assert_eq!(harness.balance(&to, "ublk").unwrap(), 200);
    assert_eq!(harness.validator_balance(0).unwrap(), 300);
    check_supply_conservation(harness.app()).unwrap();
}

#[test]
fn test_fund_account_mints_into_supply() {
    let mut harness = harness();
    let address = AccountAddress::new([3; 20]);
    let supply_before = harness.app().supply().unwrap().amount_of("ublk");

    harness
        .fund_account(&address, &Coin::new(42, "ublk").into())
        .unwrap();

    assert_eq!(harness.balance(&address, "ublk").unwrap(), 42);
    assert_eq!(
        harness.app().supply().unwrap().amount_of("ublk"),
        supply_before + 42
    );
    assert!(harness.app().account(&address).unwrap().is_some());
}

#[test]
fn test_same_seed_same_validator() {
    let first = harness();
    let second = harness();
    assert_eq!(
        first.validator_key().operator_address(),
        second.validator_key().operator_address()
    );
    assert_eq!(first.rng().seed(), 42);
}

fn end_block_failing_at(phase: Phase) {
    let mut harness = harness();
    harness.skip_block().unwrap();

    harness.app_mut().inject_failure(phase);
    harness.begin_block(false, 5).unwrap();
    harness.execute(b"txC".to_vec()).unwrap();
    let before = StateSnapshot::capture(&harness);

    let err = harness.end_block().unwrap_err();
    assert!(err.is_fatal(), "{}", err);
    assert!(
        matches!(err, HarnessError::Application { phase: failed, .. } if failed == phase),
        "{}",
        err
    );
    assert_eq!(harness.state(), DriverState::Halted);
    assert_eq!(harness.app().committed_height(), 1);
    check_state_unchanged(&before, &StateSnapshot::capture(&harness)).unwrap();
    assert!(matches!(
        harness.begin_block(false, 5),
        Err(HarnessError::Halted)
    ));
}

#[test]
fn test_prepare_failure_halts() {
    end_block_failing_at(Phase::Prepare);
}

#[test]
fn test_process_failure_halts() {
    end_block_failing_at(Phase::Process);
}

#[test]
fn test_finalize_failure_halts() {
    end_block_failing_at(Phase::Finalize);
}

fn init_failing_at(phase: Phase) -> HarnessError {
    init_logger();
    let home = TempNodeHome::new().unwrap();
    let config = HarnessConfig {
        node_home: Some(home.path_buf()),
        genesis_time: Some(GENESIS_TIME),
        seed: Some(42),
        ..Default::default()
    };

    let mut app = ChainHarness::<MemApp>::new_app(home.path(), &config).unwrap();
    app.inject_failure(phase);
    match ChainHarness::init(app, config) {
        Ok(_) => panic!("initialization succeeded despite a failing {}", phase),
        Err(err) => err,
    }
}

#[test]
fn test_init_chain_failure_fails_init() {
    let err = init_failing_at(Phase::InitChain);
    assert!(err.is_fatal());
    assert!(matches!(
        err,
        HarnessError::Application {
            phase: Phase::InitChain,
            ..
        }
    ));
}

#[test]
fn test_signing_info_failure_fails_init() {
    let err = init_failing_at(Phase::SigningInfo);
    assert!(err.is_fatal());
    assert!(matches!(
        err,
        HarnessError::Application {
            phase: Phase::SigningInfo,
            ..
        }
    ));
}

#[test]
fn test_init_account_creates_funded_account() {
    let mut harness = harness();
    let coins: Coins = Coin::new(1_000, "ublk").into();

    let key = harness.init_account(&coins).unwrap();
    let address = key.account_address();

    assert_eq!(harness.balance(&address, "ublk").unwrap(), 1_000);
    assert!(harness.app().account(&address).unwrap().is_some());
    assert_ne!(address, harness.validator_key().account_address());
    check_supply_conservation(harness.app()).unwrap();
}

#[test]
fn test_init_accounts_are_distinct_and_seeded() {
    let coins: Coins = Coin::new(25, "ublk").into();

    let mut first = harness();
    let keys = first.init_accounts(&coins, 3).unwrap();
    assert_eq!(keys.len(), 3);
    assert_ne!(keys[0], keys[1]);
    assert_ne!(keys[1], keys[2]);
    for key in &keys {
        assert_eq!(first.balance(&key.account_address(), "ublk").unwrap(), 25);
    }

    let mut second = harness();
    let replayed = second.init_accounts(&coins, 3).unwrap();
    assert_eq!(keys, replayed);
}

#[test]
fn test_init_account_refused_when_halted() {
    let mut harness = harness();
    harness.app_mut().reject_next_proposal();
    harness.begin_block(false, 5).unwrap();
    assert!(harness.end_block().unwrap_err().is_rejection());

    let coins: Coins = Coin::new(1, "ublk").into();
    assert!(matches!(
        harness.init_account(&coins),
        Err(HarnessError::Halted)
    ));
}

#[test]
fn test_init_account_funding_failure() {
    let mut harness = harness();
    harness.app_mut().inject_failure(Phase::Funding);

    let coins: Coins = Coin::new(1, "ublk").into();
    let err = harness.init_account(&coins).unwrap_err();
    assert!(matches!(err, HarnessError::Funding { .. }));
}
