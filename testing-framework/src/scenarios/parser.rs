//! YAML scenario parser
//!
//! Amounts may be written as numbers or as strings; strings are the safe
//! form for values above 2^53 (`"9223372036854775807"`).

use indexmap::IndexSet;
use serde::{de, Deserialize, Deserializer, Serialize};
use std::{fmt, path::Path};

use crate::harness::{HarnessConfig, HarnessError};

/// Name that resolves to the genesis validator's account
pub const VALIDATOR_ACCOUNT: &str = "validator";

/// A complete scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestScenario {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub harness: HarnessConfig,
    /// Named accounts funded at genesis in the bond denomination
    #[serde(default)]
    pub accounts: Vec<ScenarioAccount>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioAccount {
    pub name: String,
    #[serde(deserialize_with = "amount")]
    pub balance: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndBlockExpect {
    /// Number of transaction results
    #[serde(default)]
    pub txs: Option<usize>,
    /// Number of transactions with a non-zero result code
    #[serde(default)]
    pub failed: Option<usize>,
    /// The proposal must be rejected
    #[serde(default)]
    pub rejected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    BeginBlock {
        #[serde(default)]
        epoch: bool,
        #[serde(default = "default_block_seconds")]
        seconds: u64,
    },
    /// Queue raw UTF-8 bytes
    Execute { tx: String },
    /// Queue a bank transfer in the bond denomination
    Transfer {
        from: String,
        to: String,
        #[serde(deserialize_with = "amount")]
        amount: u64,
    },
    EndBlock {
        #[serde(default)]
        expect: Option<EndBlockExpect>,
    },
    SkipBlocks { count: u64 },
    IncreaseTime { seconds: u64 },
    FundValidators,
    RejectNextProposal,
    AssertHeight { eq: u64 },
    /// Block time relative to genesis
    AssertTimeOffset { seconds: u64 },
    AssertBalance {
        account: String,
        #[serde(default)]
        denom: Option<String>,
        #[serde(default, deserialize_with = "optional_amount")]
        eq: Option<u64>,
        #[serde(default, deserialize_with = "optional_amount")]
        gte: Option<u64>,
        #[serde(default, deserialize_with = "optional_amount")]
        lte: Option<u64>,
    },
}

fn default_block_seconds() -> u64 {
    5
}

struct AmountVisitor;

impl<'de> de::Visitor<'de> for AmountVisitor {
    type Value = u64;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a non-negative integer or a decimal string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<u64, E> {
        Ok(v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<u64, E> {
        u64::try_from(v).map_err(|_| E::custom(format!("negative amount {}", v)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<u64, E> {
        v.trim()
            .parse()
            .map_err(|_| E::custom(format!("invalid amount {:?}", v)))
    }
}

fn amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    deserializer.deserialize_any(AmountVisitor)
}

fn optional_amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    amount(deserializer).map(Some)
}

/// Parse and validate a scenario
///
/// # Errors
///
/// [`HarnessError::Scenario`] on malformed YAML or when:
/// - the name or the step list is empty
/// - an account is declared twice or uses the reserved validator name
/// - a transfer spends from, or a balance assertion reads, an account
///   that is neither declared nor created by an earlier transfer
/// - a balance assertion has no expectation
pub fn parse_scenario(yaml: &str) -> Result<TestScenario, HarnessError> {
    let scenario: TestScenario =
        serde_yaml::from_str(yaml).map_err(|e| HarnessError::Scenario(e.to_string()))?;
    validate_scenario(&scenario)?;
    Ok(scenario)
}

/// Read and parse a scenario file
pub fn load_scenario(path: impl AsRef<Path>) -> Result<TestScenario, HarnessError> {
    let yaml = std::fs::read_to_string(path)?;
    parse_scenario(&yaml)
}

fn invalid(message: String) -> HarnessError {
    HarnessError::Scenario(message)
}

pub fn validate_scenario(scenario: &TestScenario) -> Result<(), HarnessError> {
    if scenario.name.trim().is_empty() {
        return Err(invalid("scenario name is empty".to_string()));
    }
    if scenario.steps.is_empty() {
        return Err(invalid(format!("scenario '{}' has no steps", scenario.name)));
    }
    scenario.harness.validate()?;

    let mut known: IndexSet<&str> = IndexSet::new();
    known.insert(VALIDATOR_ACCOUNT);
    for account in &scenario.accounts {
        if account.name == VALIDATOR_ACCOUNT {
            return Err(invalid(format!(
                "account name '{}' is reserved",
                VALIDATOR_ACCOUNT
            )));
        }
        if !known.insert(account.name.as_str()) {
            return Err(invalid(format!("duplicate account '{}'", account.name)));
        }
    }

    for (idx, step) in scenario.steps.iter().enumerate() {
        let step_no = idx + 1;
        match step {
            Step::Transfer { from, to, .. } => {
                if !known.contains(from.as_str()) {
                    return Err(invalid(format!(
                        "step {}: unknown sender account '{}'",
                        step_no, from
                    )));
                }
                known.insert(to.as_str());
            }
            Step::AssertBalance {
                account,
                eq,
                gte,
                lte,
                ..
            } => {
                if !known.contains(account.as_str()) {
                    return Err(invalid(format!(
                        "step {}: unknown account '{}'",
                        step_no, account
                    )));
                }
                if eq.is_none() && gte.is_none() && lte.is_none() {
                    return Err(invalid(format!(
                        "step {}: assert_balance needs eq, gte or lte",
                        step_no
                    )));
                }
            }
            _ => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_steps() {
        let yaml = r#"
name: "Cycle"
accounts:
  - name: "alice"
    balance: "1000"
steps:
  - action: "begin_block"
  - action: "begin_block"
    epoch: true
    seconds: 30
  - action: "transfer"
    from: "alice"
    to: "bob"
    amount: 10
  - action: "end_block"
    expect:
      txs: 1
  - action: "assert_balance"
    account: "bob"
    eq: "10"
"#;
        let scenario = parse_scenario(yaml).unwrap();
        assert_eq!(scenario.accounts[0].balance, 1000);
        assert_eq!(
            scenario.steps[0],
            Step::BeginBlock {
                epoch: false,
                seconds: 5
            }
        );
        assert_eq!(
            scenario.steps[1],
            Step::BeginBlock {
                epoch: true,
                seconds: 30
            }
        );
        assert!(matches!(
            &scenario.steps[3],
            Step::EndBlock { expect: Some(EndBlockExpect { txs: Some(1), .. }) }
        ));
        assert!(matches!(
            &scenario.steps[4],
            Step::AssertBalance { eq: Some(10), gte: None, .. }
        ));
        assert_eq!(scenario.harness, HarnessConfig::default());
    }

    #[test]
    fn test_large_amount_as_string() {
        let yaml = r#"
name: "Large"
accounts:
  - name: "whale"
    balance: "18446744073709551615"
steps:
  - action: "fund_validators"
"#;
        let scenario = parse_scenario(yaml).unwrap();
        assert_eq!(scenario.accounts[0].balance, u64::MAX);
    }

    #[test]
    fn test_unknown_action_rejected() {
        let yaml = r#"
name: "Bad"
steps:
  - action: "mine_block"
"#;
        assert!(matches!(parse_scenario(yaml), Err(HarnessError::Scenario(_))));
    }

    #[test]
    fn test_assert_balance_requires_expectation() {
        let yaml = r#"
name: "Bad"
steps:
  - action: "assert_balance"
    account: "validator"
"#;
        assert!(parse_scenario(yaml).is_err());
    }
}
