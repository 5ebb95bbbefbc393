use rand::{CryptoRng, RngCore};
use std::fmt;

use super::{AccountAddress, ConsensusAddress, KeyError, PrivateKey, PublicKey, ValidatorAddress};

/// Signing key of a validator together with the three addresses derived from
/// its public key.
#[derive(Clone, PartialEq, Eq)]
pub struct ValidatorKey {
    private_key: PrivateKey,
    public_key: PublicKey,
}

impl ValidatorKey {
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self::from_private_key(PrivateKey::generate(rng))
    }

    pub fn from_private_key(private_key: PrivateKey) -> Self {
        let public_key = private_key.public_key();
        Self {
            private_key,
            public_key,
        }
    }

    /// Import a key previously exported with [`ValidatorKey::export_hex`].
    pub fn from_hex(hex: &str) -> Result<Self, KeyError> {
        PrivateKey::from_hex(hex).map(Self::from_private_key)
    }

    pub fn export_hex(&self) -> String {
        self.private_key.to_hex()
    }

    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn account_address(&self) -> AccountAddress {
        self.public_key.account_address()
    }

    pub fn operator_address(&self) -> ValidatorAddress {
        self.public_key.operator_address()
    }

    pub fn consensus_address(&self) -> ConsensusAddress {
        self.public_key.consensus_address()
    }
}

impl fmt::Debug for ValidatorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorKey")
            .field("operator", &self.operator_address())
            .finish_non_exhaustive()
    }
}
