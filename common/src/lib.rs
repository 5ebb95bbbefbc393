#![allow(clippy::module_inception)]
#![allow(clippy::too_many_arguments)]

pub mod abci;
pub mod application;
pub mod coin;
pub mod config;
pub mod context;
pub mod crypto;
pub mod decimal;
pub mod params;
pub mod staking;
pub mod time;

pub use application::{AppError, AppGenesisState, AppOptions, Application, DebugAppOptions};
pub use coin::{Coin, Coins};
pub use context::BlockContext;
pub use decimal::Decimal;
