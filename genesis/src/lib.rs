//! Genesis construction for blocksim test chains.
//!
//! [`GenesisBuilder`] produces a [`GenesisDocument`] holding one bonded
//! validator, one funded account and the parameter snapshot of every module,
//! validated against the cross-module supply invariants before it is handed
//! to chain initialization.

mod builder;
mod document;
mod error;
mod state_hash;
pub mod types;
mod validation;

pub use builder::{GenesisBuilder, GenesisConfig, ParamProfile};
pub use document::GenesisDocument;
pub use error::GenesisError;
pub use state_hash::compute_state_hash;
pub use validation::validate_genesis;
