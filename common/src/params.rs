//! Parameter-set schemas.
//!
//! A module exposing tunable parameters implements [`ParamSet`] so generic
//! test utilities (parameter fuzzing, governance-style mutation) can discover
//! which keys exist and what kind of value each one holds.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamKind {
    Bool,
    Integer,
    Decimal,
    String,
    Address,
    Coins,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamKey {
    pub name: String,
    pub kind: ParamKind,
}

impl ParamKey {
    pub fn new(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Schema of the parameters owned by one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSetDescriptor {
    pub module: String,
    pub keys: Vec<ParamKey>,
}

impl ParamSetDescriptor {
    pub fn key(&self, name: &str) -> Option<&ParamKey> {
        self.keys.iter().find(|k| k.name == name)
    }
}

pub trait ParamSet {
    /// Identifier of the owning module.
    fn module(&self) -> &'static str;

    fn keys(&self) -> Vec<ParamKey>;

    fn descriptor(&self) -> ParamSetDescriptor {
        ParamSetDescriptor {
            module: self.module().to_string(),
            keys: self.keys(),
        }
    }
}
