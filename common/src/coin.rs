use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// Denominations are 3 to 128 chars, start with a letter and only use
// alphanumerics and `/:._-`
pub const DENOM_MIN_LENGTH: usize = 3;
pub const DENOM_MAX_LENGTH: usize = 128;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoinError {
    #[error("Invalid denomination: {0}")]
    InvalidDenom(String),
}

/// Validate a denomination string.
pub fn validate_denom(denom: &str) -> Result<(), CoinError> {
    let len = denom.len();
    if !(DENOM_MIN_LENGTH..=DENOM_MAX_LENGTH).contains(&len) {
        return Err(CoinError::InvalidDenom(denom.to_string()));
    }

    let mut chars = denom.chars();
    let starts_with_letter = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    let rest_valid = chars.all(|c| c.is_ascii_alphanumeric() || "/:._-".contains(c));
    if !starts_with_letter || !rest_valid {
        return Err(CoinError::InvalidDenom(denom.to_string()));
    }

    Ok(())
}

/// A single amount of a single denomination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: u64,
}

impl Coin {
    pub fn new(amount: u64, denom: impl Into<String>) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }

    pub fn validate(&self) -> Result<(), CoinError> {
        validate_denom(&self.denom)
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// A set of coins, kept sorted by denomination with one entry per denomination.
///
/// Additions saturate at `u64::MAX` instead of wrapping, so crediting an
/// account repeatedly can never produce a smaller balance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Coins(Vec<Coin>);

impl Coins {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn from_coins(coins: impl IntoIterator<Item = Coin>) -> Self {
        let mut set = Self::new();
        for coin in coins {
            set.add_coin(coin);
        }
        set
    }

    /// Amount held for `denom`, zero when absent.
    pub fn amount_of(&self, denom: &str) -> u64 {
        self.0
            .iter()
            .find(|c| c.denom == denom)
            .map(|c| c.amount)
            .unwrap_or(0)
    }

    pub fn add_coin(&mut self, coin: Coin) {
        match self.0.binary_search_by(|c| c.denom.as_str().cmp(&coin.denom)) {
            Ok(idx) => {
                let entry = &mut self.0[idx];
                entry.amount = entry.amount.saturating_add(coin.amount);
            }
            Err(idx) => self.0.insert(idx, coin),
        }
    }

    pub fn add(&mut self, other: &Coins) {
        for coin in other.iter() {
            self.add_coin(coin.clone());
        }
    }

    /// Subtract `coin`, returning false (and leaving the set untouched) when
    /// the balance is insufficient.
    pub fn checked_sub_coin(&mut self, coin: &Coin) -> bool {
        let Ok(idx) = self.0.binary_search_by(|c| c.denom.as_str().cmp(&coin.denom)) else {
            return coin.amount == 0;
        };
        let entry = &mut self.0[idx];
        match entry.amount.checked_sub(coin.amount) {
            Some(rest) => {
                entry.amount = rest;
                if rest == 0 {
                    self.0.remove(idx);
                }
                true
            }
            None => false,
        }
    }

    pub fn validate(&self) -> Result<(), CoinError> {
        self.0.iter().try_for_each(Coin::validate)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Coin> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|c| c.amount == 0)
    }
}

impl From<Coin> for Coins {
    fn from(coin: Coin) -> Self {
        Self::from_coins([coin])
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join(","))
    }
}
