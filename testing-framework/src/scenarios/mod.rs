//! YAML scenario DSL
//!
//! A scenario declares a harness configuration, optional named accounts
//! funded at genesis, and a list of block-cycle steps and assertions.
//!
//! ## Example Scenario
//!
//! ```yaml
//! name: "Transfer across two blocks"
//! description: "Alice pays Bob, then time moves on"
//! harness:
//!   chain_id: "blocksim-1"
//!   genesis_time: 1700000000000
//!   genesis:
//!     bond_denom: "ublk"
//! accounts:
//!   - name: "alice"
//!     balance: "1000000"
//! steps:
//!   - action: "begin_block"
//!     seconds: 5
//!   - action: "transfer"
//!     from: "alice"
//!     to: "bob"
//!     amount: "250000"
//!   - action: "end_block"
//!     expect:
//!       txs: 1
//!   - action: "increase_time"
//!     seconds: 60
//!   - action: "assert_height"
//!     eq: 2
//!   - action: "assert_time_offset"
//!     seconds: 65
//!   - action: "assert_balance"
//!     account: "bob"
//!     eq: "250000"
//! ```

pub mod executor;
pub mod parser;

pub use executor::{ExecutionReport, ScenarioExecutor};
pub use parser::{load_scenario, parse_scenario, Step, TestScenario};
