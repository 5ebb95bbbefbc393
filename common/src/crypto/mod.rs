mod address;
mod ed25519;
mod hash;
mod validator_key;

pub use address::*;
pub use ed25519::*;
pub use hash::*;
pub use validator_key::ValidatorKey;
