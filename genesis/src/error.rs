use blocksim_common::coin::CoinError;
use thiserror::Error;

/// Errors raised while building or validating a genesis document
#[derive(Error, Debug)]
pub enum GenesisError {
    #[error("Delegation from {delegator} references unknown validator {validator}")]
    ValidatorNotFound {
        delegator: String,
        validator: String,
    },

    #[error("Supply mismatch for {denom}: declared {declared}, balances sum to {computed}")]
    SupplyMismatch {
        denom: String,
        declared: u64,
        computed: u64,
    },

    #[error("Bonded pool holds {actual}{denom} but bonded validators hold {expected}{denom}")]
    BondedPoolMismatch {
        denom: String,
        expected: u64,
        actual: u64,
    },

    #[error("Balance overflow: total allocations would exceed maximum supply")]
    BalanceOverflow,

    #[error("Genesis has no validators")]
    EmptyValidatorSet,

    #[error("Invalid bond amount: {0}")]
    InvalidBondAmount(u64),

    #[error("Duplicate module in genesis: {0}")]
    DuplicateModule(String),

    #[error("Missing module in genesis: {0}")]
    MissingModule(String),

    #[error("Invalid state for module {module}: {source}")]
    InvalidModuleState {
        module: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    InvalidDenom(#[from] CoinError),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}
