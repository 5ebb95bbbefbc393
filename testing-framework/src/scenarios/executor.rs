//! YAML scenario execution engine
//!
//! Runs parsed scenarios against a `ChainHarness<MemApp>`.
//!
//! # Example
//!
//! ```rust,ignore
//! use blocksim_testing_framework::scenarios::{parse_scenario, ScenarioExecutor};
//!
//! let yaml = r#"
//! name: "Single block"
//! harness:
//!   genesis_time: 1700000000000
//! steps:
//!   - action: "begin_block"
//!     seconds: 5
//!   - action: "execute"
//!     tx: "txA"
//!   - action: "end_block"
//!     expect:
//!       txs: 1
//!   - action: "assert_height"
//!     eq: 1
//! "#;
//!
//! let scenario = parse_scenario(yaml)?;
//! let mut executor = ScenarioExecutor::new();
//! let report = executor.execute(scenario)?;
//! assert!(report.success);
//! ```

use anyhow::{Context, Result};
use blocksim_common::{crypto::AccountAddress, time::MILLIS_PER_SECOND, Coin};
use indexmap::IndexMap;

use super::parser::{EndBlockExpect, Step, TestScenario, VALIDATOR_ACCOUNT};
use crate::{
    app::MemApp,
    harness::{ChainHarness, HarnessBuilder},
};

/// Scenario executor that runs parsed YAML scenarios
pub struct ScenarioExecutor {
    harness: Option<ChainHarness<MemApp>>,

    /// Named accounts (name -> address)
    accounts: IndexMap<String, AccountAddress>,

    log: Vec<String>,

    /// Current step number (1-indexed)
    current_step: usize,
}

impl ScenarioExecutor {
    pub fn new() -> Self {
        Self {
            harness: None,
            accounts: IndexMap::new(),
            log: Vec::new(),
            current_step: 0,
        }
    }

    /// Execute a complete scenario
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Harness setup fails
    /// - Any step execution fails
    /// - Any assertion fails
    pub fn execute(&mut self, scenario: TestScenario) -> Result<ExecutionReport> {
        self.run_steps(&scenario)?;
        Ok(self.report(scenario.name, None, None))
    }

    /// Execute a complete scenario, turning a failure into a failed report
    ///
    /// # Returns
    ///
    /// A report with `success == false`, the failing step number (`None`
    /// when harness setup failed) and the error chain when any step fails.
    pub fn run(&mut self, scenario: TestScenario) -> ExecutionReport {
        match self.run_steps(&scenario) {
            Ok(()) => self.report(scenario.name, None, None),
            Err(err) => {
                let message = format!("{:#}", err);
                self.log(format!("=== Scenario failed: {} ===", message));
                let failed_step = (self.current_step > 0).then_some(self.current_step);
                self.report(scenario.name, failed_step, Some(message))
            }
        }
    }

    fn report(
        &self,
        scenario_name: String,
        failed_step: Option<usize>,
        error: Option<String>,
    ) -> ExecutionReport {
        let success = error.is_none();
        let steps_executed = if success {
            self.current_step
        } else {
            self.current_step.saturating_sub(1)
        };
        ExecutionReport {
            scenario_name,
            steps_executed,
            success,
            failed_step,
            error,
            log: self.log.clone(),
        }
    }

    fn run_steps(&mut self, scenario: &TestScenario) -> Result<()> {
        self.log.clear();
        self.accounts.clear();
        self.current_step = 0;

        self.log(format!("Starting scenario: {}", scenario.name));
        if let Some(desc) = &scenario.description {
            self.log(format!("Description: {}", desc));
        }

        self.setup(scenario).context("Failed to set up harness")?;

        for (idx, step) in scenario.steps.iter().enumerate() {
            self.current_step = idx + 1;
            self.log(format!("--- Step {}: {:?} ---", self.current_step, step));

            self.execute_step(step)
                .with_context(|| format!("Failed at step {} ({:?})", self.current_step, step))?;
        }

        self.log("=== Scenario completed successfully ===".to_string());
        Ok(())
    }

    fn setup(&mut self, scenario: &TestScenario) -> Result<()> {
        let denom = scenario.harness.bond_denom().to_string();
        let mut builder = HarnessBuilder::new().with_config(scenario.harness.clone());

        for account in &scenario.accounts {
            let address = Self::account_address(&account.name);
            self.accounts.insert(account.name.clone(), address);
            builder = builder.with_funded_account(
                address,
                Coin::new(account.balance, denom.clone()).into(),
            );
            self.log(format!(
                "  Account '{}': balance={}{} ({})",
                account.name, account.balance, denom, address
            ));
        }

        let harness = builder.build::<MemApp>()?;
        self.accounts.insert(
            VALIDATOR_ACCOUNT.to_string(),
            harness.validator_key().account_address(),
        );
        self.log(format!(
            "Genesis complete: chain {}, {} named account(s)",
            harness.chain_id(),
            scenario.accounts.len()
        ));
        self.harness = Some(harness);
        Ok(())
    }

    fn harness(&mut self) -> Result<&mut ChainHarness<MemApp>> {
        self.harness.as_mut().context("Harness not initialized")
    }

    fn execute_step(&mut self, step: &Step) -> Result<()> {
        match step {
            Step::BeginBlock { epoch, seconds } => {
                let harness = self.harness()?;
                harness.begin_block(*epoch, *seconds)?;
                let (height, time) = (harness.height(), harness.block_time());
                self.log(format!("  Opened block {} at {}", height, time));
            }
            Step::Execute { tx } => {
                self.harness()?.execute(tx.as_bytes().to_vec())?;
                self.log(format!("  Queued {} byte(s)", tx.len()));
            }
            Step::Transfer { from, to, amount } => self.execute_transfer(from, to, *amount)?,
            Step::EndBlock { expect } => self.execute_end_block(expect.as_ref())?,
            Step::SkipBlocks { count } => {
                self.harness()?.skip_blocks(*count)?;
                self.log(format!("  Skipped {} block(s)", count));
            }
            Step::IncreaseTime { seconds } => {
                self.harness()?.increase_time(*seconds)?;
                self.log(format!("  Time increased by {}s", seconds));
            }
            Step::FundValidators => {
                self.harness()?.fund_validators()?;
                self.log("  Validators funded".to_string());
            }
            Step::RejectNextProposal => {
                self.harness()?.app_mut().reject_next_proposal();
                self.log("  Next proposal will be rejected".to_string());
            }
            Step::AssertHeight { eq } => {
                let actual = self.harness()?.height();
                if actual != *eq {
                    anyhow::bail!("Height assertion failed: expected {}, got {}", eq, actual);
                }
                self.log(format!("  ✓ Height equals {}", eq));
            }
            Step::AssertTimeOffset { seconds } => {
                let harness = self.harness()?;
                let offset = harness.block_time().saturating_sub(harness.genesis_time());
                let expected = seconds
                    .checked_mul(MILLIS_PER_SECOND)
                    .with_context(|| format!("Time offset of {}s is out of range", seconds))?;
                if offset != expected {
                    anyhow::bail!(
                        "Time assertion failed: expected +{}s, got +{}ms",
                        seconds,
                        offset
                    );
                }
                self.log(format!("  ✓ Block time is genesis + {}s", seconds));
            }
            Step::AssertBalance {
                account,
                denom,
                eq,
                gte,
                lte,
            } => self.execute_assert_balance(account, denom.as_deref(), *eq, *gte, *lte)?,
        }
        Ok(())
    }

    fn execute_transfer(&mut self, from: &str, to: &str, amount: u64) -> Result<()> {
        let from_addr = *self.get_account(from)?;
        let to_addr = self.get_or_create_account(to);

        let harness = self.harness()?;
        let denom = harness.config().bond_denom().to_string();
        let tx = MemApp::transfer_tx(from_addr, to_addr, Coin::new(amount, denom.clone()))?;
        harness.execute(tx)?;

        self.log(format!("  Transfer queued: {} -> {} ({}{})", from, to, amount, denom));
        Ok(())
    }

    fn execute_end_block(&mut self, expect: Option<&EndBlockExpect>) -> Result<()> {
        let expect = expect.cloned().unwrap_or_default();
        let result = self.harness()?.end_block();

        if expect.rejected {
            match result {
                Err(err) if err.is_rejection() => {
                    self.log(format!("  ✓ Proposal rejected: {}", err));
                    return Ok(());
                }
                Err(err) => return Err(err).context("Expected a proposal rejection"),
                Ok(_) => anyhow::bail!("Expected the proposal to be rejected, but it committed"),
            }
        }

        let response = result?;
        let failed = response.tx_results.iter().filter(|r| !r.is_ok()).count();

        if let Some(txs) = expect.txs {
            if response.tx_results.len() != txs {
                anyhow::bail!(
                    "Expected {} tx result(s), got {}",
                    txs,
                    response.tx_results.len()
                );
            }
        }
        if let Some(expected_failed) = expect.failed {
            if failed != expected_failed {
                anyhow::bail!(
                    "Expected {} failed tx(s), got {}",
                    expected_failed,
                    failed
                );
            }
        }

        let height = self.harness()?.height();
        self.log(format!(
            "  ✓ Block {} committed: {} tx(s), {} failed, app_hash={}",
            height,
            response.tx_results.len(),
            failed,
            response.app_hash
        ));
        Ok(())
    }

    fn execute_assert_balance(
        &mut self,
        account: &str,
        denom: Option<&str>,
        eq: Option<u64>,
        gte: Option<u64>,
        lte: Option<u64>,
    ) -> Result<()> {
        let address = *self.get_account(account)?;
        let harness = self.harness()?;
        let denom = denom.unwrap_or(harness.config().bond_denom()).to_string();
        let actual = harness.balance(&address, &denom)?;

        self.log(format!(
            "Assert balance for '{}': actual={}{}",
            account, actual, denom
        ));

        if let Some(eq) = eq {
            if actual != eq {
                anyhow::bail!(
                    "Balance assertion failed: expected {}, got {}",
                    eq,
                    actual
                );
            }
            self.log(format!("  ✓ Balance equals {}", eq));
        }
        if let Some(gte) = gte {
            if actual < gte {
                anyhow::bail!("Balance {} < {}", actual, gte);
            }
            self.log(format!("  ✓ Balance >= {}", gte));
        }
        if let Some(lte) = lte {
            if actual > lte {
                anyhow::bail!("Balance {} > {}", actual, lte);
            }
            self.log(format!("  ✓ Balance <= {}", lte));
        }
        Ok(())
    }

    fn get_account(&self, name: &str) -> Result<&AccountAddress> {
        self.accounts
            .get(name)
            .with_context(|| format!("Account '{}' not found", name))
    }

    fn get_or_create_account(&mut self, name: &str) -> AccountAddress {
        *self
            .accounts
            .entry(name.to_string())
            .or_insert_with(|| Self::account_address(name))
    }

    /// Deterministic address of a named scenario account
    pub fn account_address(name: &str) -> AccountAddress {
        AccountAddress::module(&format!("scenario/{}", name))
    }

    fn log(&mut self, message: String) {
        log::debug!("{}", message);
        self.log.push(message);
    }

    pub fn get_log(&self) -> &[String] {
        &self.log
    }

    /// Harness of the last executed scenario
    pub fn harness_ref(&self) -> Option<&ChainHarness<MemApp>> {
        self.harness.as_ref()
    }
}

impl Default for ScenarioExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// Execution report
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub scenario_name: String,

    /// Number of steps completed
    pub steps_executed: usize,

    pub success: bool,

    /// 1-indexed step that failed, `None` on success or setup failure
    pub failed_step: Option<usize>,

    pub error: Option<String>,

    pub log: Vec<String>,
}

impl ExecutionReport {
    /// Print report to stdout
    pub fn print(&self) {
        println!("\n╔════════════════════════════════════════════════════════════╗");
        println!("║  Scenario Execution Report                                 ║");
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║  Name: {:<51} ║", self.scenario_name);
        println!("║  Steps: {:<50} ║", self.steps_executed);
        println!(
            "║  Status: {:<49} ║",
            if self.success { "SUCCESS ✓" } else { "FAILED ✗" }
        );
        if let Some(step) = self.failed_step {
            println!("║  Failed step: {:<44} ║", step);
        }
        println!("╚════════════════════════════════════════════════════════════╝\n");

        println!("Execution Log:");
        println!("═════════════");
        for entry in &self.log {
            println!("{}", entry);
        }
    }
}
