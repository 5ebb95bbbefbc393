// File: testing-framework/src/harness/registry.rs
//
// Parameter-type registry
//
// Module id -> parameter-set schema, so generic tests (parameter fuzzing,
// governance-style mutation) can discover which modules expose tunable
// parameters. Registration is append-only and a module can only be
// registered once.

use blocksim_common::params::{ParamSet, ParamSetDescriptor};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::Arc;

use super::error::HarnessError;

/// Shared, append-only registry. Clones share the same entries.
#[derive(Clone, Default)]
pub struct ParamTypeRegistry {
    entries: Arc<RwLock<IndexMap<String, ParamSetDescriptor>>>,
}

impl ParamTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the schema of `params` under its module id.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::DuplicateParamSet`] if the module is already
    /// registered; the existing entry is left untouched.
    pub fn register(&self, params: &dyn ParamSet) -> Result<(), HarnessError> {
        let descriptor = params.descriptor();
        let mut entries = self.entries.write();
        if entries.contains_key(&descriptor.module) {
            return Err(HarnessError::DuplicateParamSet(descriptor.module));
        }

        log::debug!(
            "Registered param set for module {} ({} keys)",
            descriptor.module,
            descriptor.keys.len()
        );
        entries.insert(descriptor.module.clone(), descriptor);
        Ok(())
    }

    pub fn contains(&self, module: &str) -> bool {
        self.entries.read().contains_key(module)
    }

    pub fn descriptor(&self, module: &str) -> Option<ParamSetDescriptor> {
        self.entries.read().get(module).cloned()
    }

    /// Registered module ids, in registration order.
    pub fn modules(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
