// File: testing-framework/src/app/tx.rs
//
// Messages understood by the in-memory application
//
// Transactions are opaque to the harness. The reference application
// decodes JSON messages it knows and treats any other payload as a no-op.

use blocksim_common::{
    abci::{Event, ExecTxResult, Tx},
    crypto::AccountAddress,
    Coins,
};
use serde::{Deserialize, Serialize};

/// Gas charged per transaction byte
pub const GAS_PER_BYTE: i64 = 10;

/// Result code of a transfer without enough funds
pub const CODE_INSUFFICIENT_FUNDS: u32 = 5;
/// Result code of a malformed message
pub const CODE_INVALID_REQUEST: u32 = 18;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppTx {
    /// Move `amount` from one account to another
    Transfer {
        from: AccountAddress,
        to: AccountAddress,
        amount: Coins,
    },
}

impl AppTx {
    pub fn transfer(from: AccountAddress, to: AccountAddress, amount: Coins) -> Self {
        AppTx::Transfer { from, to, amount }
    }

    /// Decode a known message; `None` for opaque payloads.
    pub fn decode(tx: &[u8]) -> Option<Self> {
        serde_json::from_slice(tx).ok()
    }

    pub fn encode(&self) -> Result<Tx, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

pub(crate) fn gas_for(tx: &[u8]) -> i64 {
    (tx.len() as i64).saturating_mul(GAS_PER_BYTE)
}

pub(crate) fn success(tx: &[u8], events: Vec<Event>) -> ExecTxResult {
    let gas = gas_for(tx);
    ExecTxResult {
        code: 0,
        gas_wanted: gas,
        gas_used: gas,
        events,
        ..Default::default()
    }
}

pub(crate) fn failure(tx: &[u8], code: u32, codespace: &str, log: String) -> ExecTxResult {
    let gas = gas_for(tx);
    ExecTxResult {
        code,
        log,
        gas_wanted: gas,
        gas_used: gas,
        codespace: codespace.to_string(),
        ..Default::default()
    }
}

pub(crate) fn transfer_event(from: &AccountAddress, to: &AccountAddress, amount: &Coins) -> Event {
    Event::new("transfer")
        .with_attribute("sender", from.to_string())
        .with_attribute("recipient", to.to_string())
        .with_attribute("amount", amount.to_string())
}
