use blocksim_common::{
    coin::validate_denom,
    config::{
        AUTH_MODULE, BANK_MODULE, BONDED_POOL_NAME, DEFAULT_BOND_DENOM, DISTRIBUTION_MODULE,
        MINT_MODULE, POWER_REDUCTION, STAKING_MODULE, WASM_MODULE,
    },
    crypto::{AccountAddress, PrivateKey, ValidatorKey},
    staking::{BondStatus, Commission, CommissionRates, Delegation, ValidatorRecord},
    AppGenesisState, Application, Coin, Coins, Decimal,
};
use indexmap::IndexMap;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    document::GenesisDocument,
    error::GenesisError,
    types::{
        AuthGenesis, Balance, BankGenesis, BaseAccount, DistributionGenesis, MintGenesis,
        StakingGenesis, WasmGenesis, WasmParams,
    },
    validation::validate_genesis,
};

/// Which module parameters the builder writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamProfile {
    /// Fixed test-friendly mint, distribution and commission values.
    #[default]
    Tuned,
    /// Keep the application's default params, zero commission.
    AppDefaults,
}

/// Configuration of the genesis builder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenesisConfig {
    /// Bonding, fee and mint denomination of every module
    pub bond_denom: String,
    /// Tokens bonded by the genesis validator
    pub bond_amount: u64,
    /// Spendable balance of the generated funded account
    pub funded_account_balance: u64,
    pub param_profile: ParamProfile,
    /// Additional accounts funded at genesis
    pub extra_balances: Vec<Balance>,
    /// Whole module states replacing whatever the builder produced
    pub module_overrides: IndexMap<String, Value>,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            bond_denom: DEFAULT_BOND_DENOM.to_string(),
            bond_amount: POWER_REDUCTION,
            funded_account_balance: 0,
            param_profile: ParamProfile::default(),
            extra_balances: Vec::new(),
            module_overrides: IndexMap::new(),
        }
    }
}

/// Assembles the initial state of a single-validator test chain.
pub struct GenesisBuilder {
    config: GenesisConfig,
}

impl GenesisBuilder {
    pub fn new(config: GenesisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GenesisConfig {
        &self.config
    }

    /// Build the genesis document on top of the application's defaults.
    pub fn build<A: Application, R: RngCore + CryptoRng>(
        &self,
        app: &A,
        rng: &mut R,
    ) -> Result<(GenesisDocument, ValidatorKey), GenesisError> {
        self.build_from_defaults(app.default_genesis(), rng)
    }

    pub fn build_from_defaults<R: RngCore + CryptoRng>(
        &self,
        defaults: AppGenesisState,
        rng: &mut R,
    ) -> Result<(GenesisDocument, ValidatorKey), GenesisError> {
        let denom = self.config.bond_denom.as_str();
        validate_denom(denom)?;
        if self.config.bond_amount == 0 {
            return Err(GenesisError::InvalidBondAmount(self.config.bond_amount));
        }

        let mut doc = GenesisDocument::from(defaults);

        let validator_key = ValidatorKey::generate(rng);
        let funded_key = PrivateKey::generate(rng);
        let funded_address = funded_key.account_address();

        // auth: the funded account first, then the extra ones
        let mut auth: AuthGenesis = doc.module_or_default(AUTH_MODULE)?;
        auth.accounts = std::iter::once(funded_address)
            .chain(self.config.extra_balances.iter().map(|b| b.address))
            .enumerate()
            .map(|(number, address)| BaseAccount::new(address, number as u64))
            .collect();
        doc.insert(AUTH_MODULE, &auth)?;

        // staking: one bonded validator, delegated to by the funded account
        let mut staking: StakingGenesis = doc.module_or_default(STAKING_MODULE)?;
        staking.params.bond_denom = denom.to_string();
        let validator = self.genesis_validator(&validator_key);
        staking.delegations = vec![Delegation {
            delegator_address: funded_address,
            validator_address: validator.operator_address,
            shares: Decimal::one(),
        }];
        staking.validators = vec![validator];
        doc.insert(STAKING_MODULE, &staking)?;

        let mut mint: MintGenesis = doc.module_or_default(MINT_MODULE)?;
        mint.params.mint_denom = denom.to_string();
        if self.config.param_profile == ParamProfile::Tuned {
            mint.params.inflation_min = Decimal::with_prec(7, 2);
            mint.params.inflation_max = Decimal::with_prec(20, 2);
            mint.params.inflation_rate_change = Decimal::with_prec(13, 2);
            mint.params.goal_bonded = Decimal::with_prec(67, 2);
            mint.minter.inflation = Decimal::with_prec(13, 2);
            mint.minter.annual_provisions = Decimal::zero();
        }
        doc.insert(MINT_MODULE, &mint)?;

        if self.config.param_profile == ParamProfile::Tuned {
            let mut distribution: DistributionGenesis =
                doc.module_or_default(DISTRIBUTION_MODULE)?;
            distribution.params.community_tax = Decimal::with_prec(2, 2);
            distribution.params.base_proposer_reward = Decimal::with_prec(1, 2);
            distribution.params.bonus_proposer_reward = Decimal::with_prec(4, 2);
            distribution.params.withdraw_addr_enabled = true;
            doc.insert(DISTRIBUTION_MODULE, &distribution)?;
        }

        // Code upload without governance
        let mut wasm: WasmGenesis = doc.module_or_default(WASM_MODULE)?;
        wasm.params = WasmParams::permissionless();
        doc.insert(WASM_MODULE, &wasm)?;

        let bank = self.bank_genesis(&doc, funded_address, staking.delegations.len())?;
        doc.insert(BANK_MODULE, &bank)?;

        for (module, state) in &self.config.module_overrides {
            log::debug!("Overriding genesis state of module {}", module);
            doc.insert_raw(module, state.clone());
        }

        let state_hash = validate_genesis(&doc)?;
        log::info!(
            "Built genesis: validator {}, funded account {}, state hash {}",
            validator_key.operator_address(),
            funded_address,
            state_hash
        );

        Ok((doc, validator_key))
    }

    fn genesis_validator(&self, key: &ValidatorKey) -> ValidatorRecord {
        let rates = match self.config.param_profile {
            ParamProfile::Tuned => CommissionRates::new(
                Decimal::with_prec(5, 2),
                Decimal::with_prec(20, 2),
                Decimal::with_prec(1, 2),
            ),
            ParamProfile::AppDefaults => CommissionRates::default(),
        };

        ValidatorRecord {
            operator_address: key.operator_address(),
            consensus_pubkey: *key.public_key(),
            jailed: false,
            status: BondStatus::Bonded,
            tokens: self.config.bond_amount,
            delegator_shares: Decimal::one(),
            unbonding_height: 0,
            unbonding_time: 0,
            commission: Commission {
                rates,
                update_time: 0,
            },
            min_self_delegation: 0,
        }
    }

    // Supply is every configured balance plus one bond per delegation, the
    // bonds being held by the bonded pool module account.
    fn bank_genesis(
        &self,
        doc: &GenesisDocument,
        funded_address: AccountAddress,
        delegations: usize,
    ) -> Result<BankGenesis, GenesisError> {
        let denom = self.config.bond_denom.as_str();
        let mut bank: BankGenesis = doc.module_or_default(BANK_MODULE)?;
        bank.balances.clear();

        if self.config.funded_account_balance > 0 {
            bank.balances.push(Balance {
                address: funded_address,
                coins: Coins::from(Coin::new(self.config.funded_account_balance, denom)),
            });
        }
        bank.balances.extend(self.config.extra_balances.iter().cloned());

        let mut supply = bank.sum_balances().ok_or(GenesisError::BalanceOverflow)?;
        let bonded = self
            .config
            .bond_amount
            .checked_mul(delegations as u64)
            .ok_or(GenesisError::BalanceOverflow)?;
        supply
            .amount_of(denom)
            .checked_add(bonded)
            .ok_or(GenesisError::BalanceOverflow)?;
        supply.add_coin(Coin::new(bonded, denom));

        bank.balances.push(Balance {
            address: AccountAddress::module(BONDED_POOL_NAME),
            coins: Coins::from(Coin::new(bonded, denom)),
        });
        bank.supply = supply;

        Ok(bank)
    }
}
