//! # Blocksim Testing Framework
//!
//! Deterministic, single-process block-execution harness for exercising a
//! blockchain state machine in tests, without a peer-to-peer network or a
//! real consensus protocol.
//!
//! ## Architecture Overview
//!
//! - **GenesisBuilder** (`blocksim_genesis`): one bonded validator, one
//!   funded account, per-module parameter snapshots
//! - **ChainHarness**: owns the application, the block context, the
//!   validator keys and the parameter-type registry
//! - **BlockCycleDriver**: BeginBlock -> Execute* -> EndBlock, where
//!   EndBlock runs Prepare, Process, Finalize and Commit in order
//! - **ValidatorFunder** and **ParamTypeRegistry**
//! - **MemApp**: in-memory reference application
//! - **Scenarios**: YAML DSL on top of the harness
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use blocksim_testing_framework::prelude::*;
//!
//! #[test]
//! fn test_single_block() -> anyhow::Result<()> {
//!     let mut harness = HarnessBuilder::new()
//!         .with_genesis_time(1_700_000_000_000)
//!         .build::<MemApp>()?;
//!
//!     harness.begin_block(false, 5)?;
//!     harness.execute(b"txA".to_vec())?;
//!     let response = harness.end_block()?;
//!
//!     assert_eq!(response.tx_results.len(), 1);
//!     assert_eq!(harness.height(), 1);
//!     Ok(())
//! }
//! ```
//!
//! ## Design Principles
//!
//! 1. **Deterministic**: block time is driven by the harness, keys come
//!    from a seeded RNG (`BLOCKSIM_TEST_SEED`)
//! 2. **Typed failures**: a rejected proposal is a named error, misuse of
//!    the block cycle is reported, everything else is fatal
//! 3. **No global state**: the denomination is configuration, not a
//!    process-wide default

#![warn(clippy::all)]

/// In-memory reference application
pub mod app;

/// Chain harness, block-cycle driver, funding and parameter registry
pub mod harness;

/// Core invariant checkers (supply conservation, block progression)
pub mod invariants;

/// Deterministic RNG
pub mod orchestrator;

// DSL scenario parser and executor
pub mod scenarios;

/// Temporary node homes
pub mod utilities;

// Convenient re-exports for common usage
pub mod prelude;

pub use app::MemApp;
pub use harness::{
    ChainHarness, DriverState, GasMode, HarnessBuilder, HarnessConfig, HarnessError,
    ProposerSelection,
};
pub use orchestrator::TestRng;

/// Framework version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Framework version descriptor
pub const FRAMEWORK_VERSION: &str = "Blocksim Testing Framework 0.1";
