// File: testing-framework/src/orchestrator/mod.rs
//
// Orchestrator Module - Deterministic Infrastructure
//
// Sources of non-determinism a harness touches are funnelled through here.
// Block time is owned by the harness context itself, so only randomness
// needs a seeded stand-in.

/// Deterministic random number generation for reproducible tests
pub mod rng;

pub use rng::{TestRng, SEED_ENV_VAR};
