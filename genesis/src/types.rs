//! Per-module genesis states.
//!
//! Every module state is serialized as one JSON value under its module id in
//! the [`GenesisDocument`](crate::GenesisDocument). `Default` gives the
//! application defaults; the builder overrides what the test chain needs.

use blocksim_common::{
    config::{
        AUTH_MODULE, BANK_MODULE, DEFAULT_BOND_DENOM, DISTRIBUTION_MODULE, MINT_MODULE,
        REWARDS_MODULE, SLASHING_MODULE, STAKING_MODULE, WASM_MODULE,
    },
    crypto::{AccountAddress, PublicKey},
    params::{ParamKey, ParamKind, ParamSet},
    staking::{Delegation, ValidatorRecord, ValidatorSigningInfo},
    AppGenesisState, Coins, Decimal,
};
use serde::{Deserialize, Serialize};

// ===== auth =====

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthParams {
    pub max_memo_characters: u64,
    pub tx_sig_limit: u64,
    pub tx_size_cost_per_byte: u64,
    pub sig_verify_cost_ed25519: u64,
}

impl Default for AuthParams {
    fn default() -> Self {
        Self {
            max_memo_characters: 256,
            tx_sig_limit: 7,
            tx_size_cost_per_byte: 10,
            sig_verify_cost_ed25519: 590,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseAccount {
    pub address: AccountAddress,
    #[serde(default)]
    pub pub_key: Option<PublicKey>,
    pub account_number: u64,
    pub sequence: u64,
}

impl BaseAccount {
    pub fn new(address: AccountAddress, account_number: u64) -> Self {
        Self {
            address,
            pub_key: None,
            account_number,
            sequence: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthGenesis {
    pub params: AuthParams,
    pub accounts: Vec<BaseAccount>,
}

// ===== bank =====

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankParams {
    pub default_send_enabled: bool,
}

impl Default for BankParams {
    fn default() -> Self {
        Self {
            default_send_enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub address: AccountAddress,
    pub coins: Coins,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BankGenesis {
    pub params: BankParams,
    pub balances: Vec<Balance>,
    pub supply: Coins,
}

impl BankGenesis {
    /// Sum of every balance, `None` on overflow.
    pub fn sum_balances(&self) -> Option<Coins> {
        let mut total = Coins::new();
        for balance in &self.balances {
            for coin in balance.coins.iter() {
                let current = total.amount_of(&coin.denom);
                current.checked_add(coin.amount)?;
                total.add_coin(coin.clone());
            }
        }
        Some(total)
    }

    pub fn balance_of(&self, address: &AccountAddress) -> Option<&Coins> {
        self.balances
            .iter()
            .find(|b| &b.address == address)
            .map(|b| &b.coins)
    }
}

// ===== staking =====

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingParams {
    pub unbonding_time_seconds: u64,
    pub max_validators: u32,
    pub max_entries: u32,
    pub historical_entries: u32,
    pub bond_denom: String,
    pub min_commission_rate: Decimal,
}

impl Default for StakingParams {
    fn default() -> Self {
        Self {
            // 21 days
            unbonding_time_seconds: 1_814_400,
            max_validators: 100,
            max_entries: 7,
            historical_entries: 10_000,
            bond_denom: DEFAULT_BOND_DENOM.to_string(),
            min_commission_rate: Decimal::zero(),
        }
    }
}

impl ParamSet for StakingParams {
    fn module(&self) -> &'static str {
        STAKING_MODULE
    }

    fn keys(&self) -> Vec<ParamKey> {
        vec![
            ParamKey::new("unbonding_time_seconds", ParamKind::Integer),
            ParamKey::new("max_validators", ParamKind::Integer),
            ParamKey::new("max_entries", ParamKind::Integer),
            ParamKey::new("historical_entries", ParamKind::Integer),
            ParamKey::new("bond_denom", ParamKind::String),
            ParamKey::new("min_commission_rate", ParamKind::Decimal),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StakingGenesis {
    pub params: StakingParams,
    pub validators: Vec<ValidatorRecord>,
    pub delegations: Vec<Delegation>,
}

impl StakingGenesis {
    /// Tokens held by bonded validators.
    pub fn bonded_tokens(&self) -> Option<u64> {
        self.validators
            .iter()
            .filter(|v| v.is_bonded())
            .try_fold(0u64, |acc, v| acc.checked_add(v.tokens))
    }
}

// ===== mint =====

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Minter {
    pub inflation: Decimal,
    pub annual_provisions: Decimal,
}

impl Default for Minter {
    fn default() -> Self {
        Self {
            inflation: Decimal::with_prec(13, 2),
            annual_provisions: Decimal::zero(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintParams {
    pub mint_denom: String,
    pub inflation_rate_change: Decimal,
    pub inflation_max: Decimal,
    pub inflation_min: Decimal,
    pub goal_bonded: Decimal,
    pub blocks_per_year: u64,
}

impl Default for MintParams {
    fn default() -> Self {
        Self {
            mint_denom: DEFAULT_BOND_DENOM.to_string(),
            inflation_rate_change: Decimal::with_prec(13, 2),
            inflation_max: Decimal::with_prec(20, 2),
            inflation_min: Decimal::with_prec(7, 2),
            goal_bonded: Decimal::with_prec(67, 2),
            // 60 * 60 * 8766 / 5, five second blocks
            blocks_per_year: 6_311_520,
        }
    }
}

impl ParamSet for MintParams {
    fn module(&self) -> &'static str {
        MINT_MODULE
    }

    fn keys(&self) -> Vec<ParamKey> {
        vec![
            ParamKey::new("mint_denom", ParamKind::String),
            ParamKey::new("inflation_rate_change", ParamKind::Decimal),
            ParamKey::new("inflation_max", ParamKind::Decimal),
            ParamKey::new("inflation_min", ParamKind::Decimal),
            ParamKey::new("goal_bonded", ParamKind::Decimal),
            ParamKey::new("blocks_per_year", ParamKind::Integer),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MintGenesis {
    pub minter: Minter,
    pub params: MintParams,
}

// ===== distribution =====

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionParams {
    pub community_tax: Decimal,
    pub base_proposer_reward: Decimal,
    pub bonus_proposer_reward: Decimal,
    pub withdraw_addr_enabled: bool,
}

impl Default for DistributionParams {
    fn default() -> Self {
        Self {
            community_tax: Decimal::with_prec(2, 2),
            base_proposer_reward: Decimal::zero(),
            bonus_proposer_reward: Decimal::zero(),
            withdraw_addr_enabled: true,
        }
    }
}

impl ParamSet for DistributionParams {
    fn module(&self) -> &'static str {
        DISTRIBUTION_MODULE
    }

    fn keys(&self) -> Vec<ParamKey> {
        vec![
            ParamKey::new("community_tax", ParamKind::Decimal),
            ParamKey::new("base_proposer_reward", ParamKind::Decimal),
            ParamKey::new("bonus_proposer_reward", ParamKind::Decimal),
            ParamKey::new("withdraw_addr_enabled", ParamKind::Bool),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributionGenesis {
    pub params: DistributionParams,
    pub community_pool: Coins,
}

// ===== wasm =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessType {
    Nobody,
    AnyOfAddresses,
    Everybody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessConfig {
    pub permission: AccessType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<AccountAddress>,
}

impl AccessConfig {
    pub fn everybody() -> Self {
        Self {
            permission: AccessType::Everybody,
            addresses: Vec::new(),
        }
    }

    pub fn nobody() -> Self {
        Self {
            permission: AccessType::Nobody,
            addresses: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WasmParams {
    pub code_upload_access: AccessConfig,
    pub instantiate_default_permission: AccessType,
}

impl Default for WasmParams {
    // Uploads are governance gated on a fresh chain
    fn default() -> Self {
        Self {
            code_upload_access: AccessConfig::nobody(),
            instantiate_default_permission: AccessType::Everybody,
        }
    }
}

impl WasmParams {
    /// Anyone may upload and instantiate code.
    pub fn permissionless() -> Self {
        Self {
            code_upload_access: AccessConfig::everybody(),
            instantiate_default_permission: AccessType::Everybody,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WasmGenesis {
    pub params: WasmParams,
}

// ===== slashing =====

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlashingParams {
    pub signed_blocks_window: u64,
    pub min_signed_per_window: Decimal,
    pub downtime_jail_duration_seconds: u64,
    pub slash_fraction_double_sign: Decimal,
    pub slash_fraction_downtime: Decimal,
}

impl Default for SlashingParams {
    fn default() -> Self {
        Self {
            signed_blocks_window: 100,
            min_signed_per_window: Decimal::with_prec(5, 1),
            downtime_jail_duration_seconds: 600,
            slash_fraction_double_sign: Decimal::with_prec(5, 2),
            slash_fraction_downtime: Decimal::with_prec(1, 2),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlashingGenesis {
    pub params: SlashingParams,
    pub signing_infos: Vec<ValidatorSigningInfo>,
}

// ===== rewards =====

/// Parameters of the contract rewards module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardsParams {
    pub inflation_rewards_ratio: Decimal,
    pub tx_fee_rebate_ratio: Decimal,
    pub max_withdraw_records: u64,
}

impl Default for RewardsParams {
    fn default() -> Self {
        Self {
            inflation_rewards_ratio: Decimal::with_prec(2, 1),
            tx_fee_rebate_ratio: Decimal::with_prec(5, 1),
            max_withdraw_records: 25_000,
        }
    }
}

impl ParamSet for RewardsParams {
    fn module(&self) -> &'static str {
        REWARDS_MODULE
    }

    fn keys(&self) -> Vec<ParamKey> {
        vec![
            ParamKey::new("inflation_rewards_ratio", ParamKind::Decimal),
            ParamKey::new("tx_fee_rebate_ratio", ParamKind::Decimal),
            ParamKey::new("max_withdraw_records", ParamKind::Integer),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardsGenesis {
    pub params: RewardsParams,
}

/// Default state of every module, in registration order.
pub fn default_app_genesis() -> Result<AppGenesisState, serde_json::Error> {
    let mut state = AppGenesisState::new();
    state.insert(AUTH_MODULE.to_string(), serde_json::to_value(AuthGenesis::default())?);
    state.insert(BANK_MODULE.to_string(), serde_json::to_value(BankGenesis::default())?);
    state.insert(STAKING_MODULE.to_string(), serde_json::to_value(StakingGenesis::default())?);
    state.insert(SLASHING_MODULE.to_string(), serde_json::to_value(SlashingGenesis::default())?);
    state.insert(MINT_MODULE.to_string(), serde_json::to_value(MintGenesis::default())?);
    state.insert(
        DISTRIBUTION_MODULE.to_string(),
        serde_json::to_value(DistributionGenesis::default())?,
    );
    state.insert(WASM_MODULE.to_string(), serde_json::to_value(WasmGenesis::default())?);
    state.insert(REWARDS_MODULE.to_string(), serde_json::to_value(RewardsGenesis::default())?);
    Ok(state)
}
