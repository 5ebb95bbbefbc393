//! Address types derived from ed25519 public keys.
//!
//! An address is the first 20 bytes of the SHA3-256 digest of the key (or of
//! the module name for module accounts). The string form is
//! `<prefix>1<hex>` where the prefix tells the three kinds apart.

use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use std::{fmt, str::FromStr};

use super::{KeyError, PublicKey};
use crate::config::{ACCOUNT_ADDRESS_PREFIX, CONSENSUS_ADDRESS_PREFIX, VALIDATOR_ADDRESS_PREFIX};

pub const ADDRESS_SIZE: usize = 20;

const SEPARATOR: char = '1';

fn derive(data: &[u8]) -> [u8; ADDRESS_SIZE] {
    let digest = Sha3_256::digest(data);
    let mut bytes = [0u8; ADDRESS_SIZE];
    bytes.copy_from_slice(&digest[..ADDRESS_SIZE]);
    bytes
}

fn parse(prefix: &str, s: &str) -> Result<[u8; ADDRESS_SIZE], KeyError> {
    let invalid = |reason: &str| KeyError::InvalidAddress {
        address: s.to_string(),
        reason: reason.to_string(),
    };

    let body = s
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix(SEPARATOR))
        .ok_or_else(|| invalid(&format!("expected prefix {}{}", prefix, SEPARATOR)))?;
    let bytes = hex::decode(body).map_err(|e| invalid(&e.to_string()))?;
    bytes
        .try_into()
        .map_err(|_| invalid(&format!("expected {} bytes", ADDRESS_SIZE)))
}

macro_rules! define_address {
    ($(#[$meta:meta])* $name:ident, $prefix:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name([u8; ADDRESS_SIZE]);

        impl $name {
            pub const PREFIX: &'static str = $prefix;

            pub const fn new(bytes: [u8; ADDRESS_SIZE]) -> Self {
                Self(bytes)
            }

            pub fn from_public_key(key: &PublicKey) -> Self {
                Self(derive(key.as_bytes()))
            }

            pub fn as_bytes(&self) -> &[u8; ADDRESS_SIZE] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}{}", Self::PREFIX, SEPARATOR, hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl FromStr for $name {
            type Err = KeyError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse(Self::PREFIX, s).map(Self)
            }
        }

        impl Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

define_address!(
    /// Address of a regular or module account.
    AccountAddress,
    ACCOUNT_ADDRESS_PREFIX
);

define_address!(
    /// Operator address of a validator.
    ValidatorAddress,
    VALIDATOR_ADDRESS_PREFIX
);

define_address!(
    /// Address a validator signs consensus messages with.
    ConsensusAddress,
    CONSENSUS_ADDRESS_PREFIX
);

impl AccountAddress {
    /// Deterministic address of a module-owned account such as the bonded pool.
    pub fn module(name: &str) -> Self {
        Self(derive(name.as_bytes()))
    }
}

impl From<ValidatorAddress> for AccountAddress {
    // Operator and account addresses share the same bytes
    fn from(addr: ValidatorAddress) -> Self {
        Self(addr.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BONDED_POOL_NAME;

    fn test_key(id: u8) -> PublicKey {
        PublicKey::from_bytes([id; 32])
    }

    #[test]
    fn test_address_kinds_share_bytes() {
        let key = test_key(1);
        let acc = key.account_address();
        let val = key.operator_address();
        let cons = key.consensus_address();
        assert_eq!(acc.as_bytes(), val.as_bytes());
        assert_eq!(val.as_bytes(), cons.as_bytes());
        assert_eq!(AccountAddress::from(val), acc);
    }

    #[test]
    fn test_display_and_parse() {
        let val = test_key(2).operator_address();
        let s = val.to_string();
        assert!(s.starts_with("blocksimvaloper1"));
        assert_eq!(s.parse::<ValidatorAddress>().unwrap(), val);
    }

    #[test]
    fn test_parse_rejects_wrong_prefix() {
        let acc = test_key(3).account_address().to_string();
        assert!(acc.parse::<ValidatorAddress>().is_err());
        assert!(acc.parse::<ConsensusAddress>().is_err());
        assert!("blocksim1zz".parse::<AccountAddress>().is_err());
        assert!("blocksim10102".parse::<AccountAddress>().is_err());
    }

    #[test]
    fn test_module_address_is_stable() {
        assert_eq!(
            AccountAddress::module(BONDED_POOL_NAME),
            AccountAddress::module(BONDED_POOL_NAME)
        );
        assert_ne!(
            AccountAddress::module(BONDED_POOL_NAME),
            AccountAddress::module("other")
        );
    }

    #[test]
    fn test_serde_uses_string_form() {
        let acc = test_key(4).account_address();
        let json = serde_json::to_string(&acc).unwrap();
        assert_eq!(json, format!("\"{}\"", acc));
        let back: AccountAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, acc);
    }
}
