// Chain-wide constants used by the genesis builder and the block harness.
//
// None of these are mutated at runtime: the bond denomination in particular
// is only a default, the effective value is carried by the genesis and
// harness configurations.

// Synthetic chain identifier used when none is configured
pub const DEFAULT_CHAIN_ID: &str = "blocksim-1";

// Default bonding and fee denomination
pub const DEFAULT_BOND_DENOM: &str = "ublk";

// Bech32-like human readable prefixes for the three address kinds
pub const ACCOUNT_ADDRESS_PREFIX: &str = "blocksim";
pub const VALIDATOR_ADDRESS_PREFIX: &str = "blocksimvaloper";
pub const CONSENSUS_ADDRESS_PREFIX: &str = "blocksimvalcons";

// Tokens bonded by each genesis validator (one unit of consensus power)
pub const POWER_REDUCTION: u64 = 1_000_000;

// Voting power assigned to the genesis validator in the validator set
pub const GENESIS_VALIDATOR_POWER: i64 = 1;

// Weight given to the selected proposer in the simulated vote info
pub const PROPOSER_VOTE_POWER: i64 = 1000;

// Byte budget handed to the proposal preparation phase
pub const MAX_PREPARE_TX_BYTES: i64 = 10_048_576;

// Consensus block parameters
pub const BLOCK_MAX_BYTES: i64 = 22_020_096;
pub const BLOCK_MAX_GAS_FIXED: i64 = 300_000_000;
// -1 means no gas ceiling
pub const BLOCK_MAX_GAS_UNLIMITED: i64 = -1;

// Amount credited to every validator account on each funding round
pub const VALIDATOR_FUND_AMOUNT: u64 = i64::MAX as u64;

// Time increment applied when a block crosses an epoch boundary
pub const EPOCH_ADVANCE_SECONDS: u64 = 1;

// Module identifiers
pub const AUTH_MODULE: &str = "auth";
pub const BANK_MODULE: &str = "bank";
pub const STAKING_MODULE: &str = "staking";
pub const SLASHING_MODULE: &str = "slashing";
pub const MINT_MODULE: &str = "mint";
pub const DISTRIBUTION_MODULE: &str = "distribution";
pub const WASM_MODULE: &str = "wasm";
pub const REWARDS_MODULE: &str = "rewards";

// Module account holding every bonded token
pub const BONDED_POOL_NAME: &str = "bonded_tokens_pool";
pub const NOT_BONDED_POOL_NAME: &str = "not_bonded_tokens_pool";

// Application option keys understood by DebugAppOptions
pub const FLAG_TRACE: &str = "trace";
pub const FLAG_SIMULATION_GAS_LIMIT: &str = "wasm.simulation_gas_limit";
