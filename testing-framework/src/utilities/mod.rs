// File: testing-framework/src/utilities/mod.rs
//
// Testing Utilities
//
// Temporary storage for node homes and other test data.

/// RAII temporary node-home directories
pub mod storage;

pub use storage::{create_temp_dir, TempNodeHome};
