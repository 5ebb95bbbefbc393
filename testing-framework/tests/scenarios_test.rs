#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

// End-to-end YAML scenarios run through ScenarioExecutor

use blocksim_testing_framework::{prelude::*, scenarios::load_scenario};
use std::path::PathBuf;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("scenarios")
        .join(name)
}

#[test]
fn test_transfer_fixture() {
    init_logger();
    let scenario = load_scenario(fixture("transfer_and_time.yaml")).unwrap();
    assert_eq!(scenario.accounts.len(), 1);

    let mut executor = ScenarioExecutor::new();
    let report = executor.execute(scenario).unwrap();
    assert!(report.success);
    assert_eq!(report.steps_executed, 8);

    let harness = executor.harness_ref().unwrap();
    check_supply_conservation(harness.app()).unwrap();
}

#[test]
fn test_rejection_scenario() {
    init_logger();
    let yaml = r#"
name: "Rejected proposal"
harness:
  seed: 5
steps:
  - action: "skip_blocks"
    count: 2
  - action: "reject_next_proposal"
  - action: "begin_block"
  - action: "execute"
    tx: "doomed"
  - action: "end_block"
    expect:
      rejected: true
  - action: "assert_height"
    eq: 3
"#;
    let scenario = parse_scenario(yaml).unwrap();
    let mut executor = ScenarioExecutor::new();
    let report = executor.execute(scenario).unwrap();
    assert!(report.success);

    let harness = executor.harness_ref().unwrap();
    assert_eq!(harness.state(), DriverState::Halted);
    assert_eq!(harness.app().committed_height(), 2);
}

#[test]
fn test_funding_scenario_with_custom_denom() {
    init_logger();
    let yaml = r#"
name: "Funding"
harness:
  seed: 6
  fund_amount: 1000
  genesis:
    bond_denom: "uatom"
steps:
  - action: "fund_validators"
  - action: "fund_validators"
  - action: "assert_balance"
    account: "validator"
    eq: 2000
  - action: "assert_balance"
    account: "validator"
    denom: "ublk"
    eq: 0
"#;
    let scenario = parse_scenario(yaml).unwrap();
    let report = ScenarioExecutor::new().execute(scenario).unwrap();
    assert_eq!(report.steps_executed, 4);
}

#[test]
fn test_failed_assertion_names_the_step() {
    init_logger();
    let yaml = r#"
name: "Wrong height"
harness:
  seed: 8
steps:
  - action: "begin_block"
  - action: "end_block"
  - action: "assert_height"
    eq: 7
"#;
    let scenario = parse_scenario(yaml).unwrap();
    let err = ScenarioExecutor::new().execute(scenario).unwrap_err();
    let message = format!("{:#}", err);
    assert!(message.contains("step 3"), "{}", message);
    assert!(message.contains("Height assertion failed"), "{}", message);
}

#[test]
fn test_misuse_step_fails_scenario() {
    init_logger();
    let yaml = r#"
name: "Execute outside a block"
harness:
  seed: 9
steps:
  - action: "execute"
    tx: "early"
"#;
    let scenario = parse_scenario(yaml).unwrap();
    let err = ScenarioExecutor::new().execute(scenario).unwrap_err();
    let harness_err = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<HarnessError>())
        .unwrap();
    assert!(harness_err.is_misuse());
}

#[test]
fn test_unknown_sender_rejected_at_parse_time() {
    let yaml = r#"
name: "Unknown sender"
steps:
  - action: "transfer"
    from: "mallory"
    to: "bob"
    amount: 1
"#;
    assert!(matches!(
        parse_scenario(yaml),
        Err(HarnessError::Scenario(_))
    ));
}

#[test]
fn test_reserved_account_name_rejected() {
    let yaml = r#"
name: "Reserved"
accounts:
  - name: "validator"
    balance: 1
steps:
  - action: "fund_validators"
"#;
    assert!(parse_scenario(yaml).is_err());
}

#[test]
fn test_out_of_range_time_offset_fails_step() {
    init_logger();
    let yaml = r#"
name: "Huge time offset"
harness:
  seed: 10
steps:
  - action: "skip_blocks"
    count: 1
  - action: "assert_time_offset"
    seconds: 18446744073709552
"#;
    let scenario = parse_scenario(yaml).unwrap();
    let err = ScenarioExecutor::new().execute(scenario).unwrap_err();
    let message = format!("{:#}", err);
    assert!(message.contains("step 2"), "{}", message);
    assert!(message.contains("out of range"), "{}", message);
}

#[test]
fn test_run_reports_failure_with_step() {
    init_logger();
    let yaml = r#"
name: "Unexpected rejection"
harness:
  seed: 12
steps:
  - action: "reject_next_proposal"
  - action: "begin_block"
  - action: "end_block"
  - action: "assert_height"
    eq: 1
"#;
    let scenario = parse_scenario(yaml).unwrap();
    let mut executor = ScenarioExecutor::new();
    let report = executor.run(scenario);

    assert!(!report.success);
    assert_eq!(report.failed_step, Some(3));
    assert_eq!(report.steps_executed, 2);
    assert!(report.error.as_deref().unwrap().contains("not accepted"));
    assert_eq!(
        executor.harness_ref().unwrap().state(),
        DriverState::Halted
    );
    report.print();
}

#[test]
fn test_run_success_report() {
    init_logger();
    let scenario = load_scenario(fixture("transfer_and_time.yaml")).unwrap();
    let report = ScenarioExecutor::new().run(scenario);
    assert!(report.success);
    assert_eq!(report.failed_step, None);
    assert!(report.error.is_none());
    assert_eq!(report.steps_executed, 8);
}
