use blocksim_common::{crypto::Hash, AppGenesisState};
use indexmap::IndexMap;
use serde::{
    de::{DeserializeOwned, MapAccess, Visitor},
    Deserialize, Deserializer, Serialize,
};
use serde_json::Value;
use std::fmt;

use crate::{error::GenesisError, state_hash::compute_state_hash};

/// Module id -> serialized module state, handed once to chain initialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct GenesisDocument {
    modules: IndexMap<String, Value>,
}

impl GenesisDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a document from `(module, state)` pairs, rejecting a module
    /// listed twice.
    pub fn from_entries(
        entries: impl IntoIterator<Item = (String, Value)>,
    ) -> Result<Self, GenesisError> {
        let mut modules = IndexMap::new();
        for (module, state) in entries {
            if modules.contains_key(&module) {
                return Err(GenesisError::DuplicateModule(module));
            }
            modules.insert(module, state);
        }
        Ok(Self { modules })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, GenesisError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Pretty-printed JSON, the form passed as app state bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, GenesisError> {
        Ok(serde_json::to_vec_pretty(&self.modules)?)
    }

    /// Replace (or add) the state of `module`.
    pub fn insert<T: Serialize>(&mut self, module: &str, state: &T) -> Result<(), GenesisError> {
        let value = serde_json::to_value(state).map_err(|source| GenesisError::InvalidModuleState {
            module: module.to_string(),
            source,
        })?;
        self.insert_raw(module, value);
        Ok(())
    }

    pub fn insert_raw(&mut self, module: &str, state: Value) {
        self.modules.insert(module.to_string(), state);
    }

    /// Decode the state of `module`.
    pub fn module<T: DeserializeOwned>(&self, module: &str) -> Result<T, GenesisError> {
        let value = self
            .modules
            .get(module)
            .ok_or_else(|| GenesisError::MissingModule(module.to_string()))?;
        decode(module, value.clone())
    }

    /// Decode the state of `module`, falling back to `T::default()` when the
    /// module is absent.
    pub fn module_or_default<T: DeserializeOwned + Default>(
        &self,
        module: &str,
    ) -> Result<T, GenesisError> {
        match self.modules.get(module) {
            Some(value) => decode(module, value.clone()),
            None => Ok(T::default()),
        }
    }

    pub fn get_raw(&self, module: &str) -> Option<&Value> {
        self.modules.get(module)
    }

    pub fn contains(&self, module: &str) -> bool {
        self.modules.contains_key(module)
    }

    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Canonical hash of the whole document, independent of module order.
    pub fn state_hash(&self) -> Hash {
        compute_state_hash(&self.modules)
    }

    pub fn into_inner(self) -> AppGenesisState {
        self.modules
    }
}

impl From<AppGenesisState> for GenesisDocument {
    fn from(modules: AppGenesisState) -> Self {
        Self { modules }
    }
}

fn decode<T: DeserializeOwned>(module: &str, value: Value) -> Result<T, GenesisError> {
    serde_json::from_value(value).map_err(|source| GenesisError::InvalidModuleState {
        module: module.to_string(),
        source,
    })
}

impl<'de> Deserialize<'de> for GenesisDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DocumentVisitor;

        impl<'de> Visitor<'de> for DocumentVisitor {
            type Value = GenesisDocument;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of module id to module state")
            }

            fn visit_map<M: MapAccess<'de>>(self, mut map: M) -> Result<Self::Value, M::Error> {
                let mut entries = Vec::new();
                while let Some(entry) = map.next_entry::<String, Value>()? {
                    entries.push(entry);
                }
                GenesisDocument::from_entries(entries).map_err(serde::de::Error::custom)
            }
        }

        deserializer.deserialize_map(DocumentVisitor)
    }
}
