// File: testing-framework/src/harness/error.rs
//
// Harness error type
//
// Failures fall in three classes: the named protocol rejection, misuse of
// the block-cycle state machine, and fatal setup or consistency errors.

use blocksim_common::{abci::ProposalStatus, AppError};
use blocksim_genesis::GenesisError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::driver::DriverState;

/// Application entry point a failure originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    NewApp,
    InitChain,
    SigningInfo,
    BeginBlock,
    Prepare,
    Process,
    Finalize,
    Commit,
    Funding,
    Query,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::NewApp => "app creation",
            Phase::InitChain => "chain initialization",
            Phase::SigningInfo => "signing info setup",
            Phase::BeginBlock => "begin block",
            Phase::Prepare => "prepare proposal",
            Phase::Process => "process proposal",
            Phase::Finalize => "finalize block",
            Phase::Commit => "commit",
            Phase::Funding => "funding",
            Phase::Query => "query",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Proposal for height {height} was not accepted: {status}")]
    ProposalRejected { height: u64, status: ProposalStatus },

    #[error("Cannot {operation} while the block cycle is {state}")]
    InvalidPhase {
        operation: &'static str,
        state: DriverState,
    },

    #[error("Harness is halted after a failed block cycle")]
    Halted,

    #[error("Genesis error: {0}")]
    Genesis(#[from] GenesisError),

    #[error("Application failed during {phase}: {source}")]
    Application {
        phase: Phase,
        #[source]
        source: AppError,
    },

    #[error("Failed to fund account {address}: {source}")]
    Funding {
        address: String,
        #[source]
        source: AppError,
    },

    #[error("Unknown validator {0}")]
    UnknownValidator(String),

    #[error("No validator available to propose")]
    NoValidators,

    #[error("Parameter set already registered for module {0}")]
    DuplicateParamSet(String),

    #[error("Invalid harness configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid scenario: {0}")]
    Scenario(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarnessError {
    pub(crate) fn app(phase: Phase, source: AppError) -> Self {
        HarnessError::Application { phase, source }
    }

    /// The expected negative-path outcome: the application refused the
    /// proposal.
    pub fn is_rejection(&self) -> bool {
        matches!(self, HarnessError::ProposalRejected { .. })
    }

    /// Contract violation of the block-cycle state machine.
    pub fn is_misuse(&self) -> bool {
        matches!(
            self,
            HarnessError::InvalidPhase { .. } | HarnessError::Halted
        )
    }

    /// Setup or consistency failure: a bug in the test or its environment.
    pub fn is_fatal(&self) -> bool {
        !self.is_rejection() && !self.is_misuse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let rejection = HarnessError::ProposalRejected {
            height: 3,
            status: ProposalStatus::Reject,
        };
        assert!(rejection.is_rejection());
        assert!(!rejection.is_fatal());

        let misuse = HarnessError::InvalidPhase {
            operation: "execute",
            state: DriverState::Idle,
        };
        assert!(misuse.is_misuse());
        assert!(!misuse.is_fatal());
        assert!(HarnessError::Halted.is_misuse());

        let fatal = HarnessError::app(Phase::Commit, AppError::Store("boom".to_string()));
        assert!(fatal.is_fatal());
        assert!(!fatal.is_rejection());
    }

    #[test]
    fn test_display() {
        let err = HarnessError::ProposalRejected {
            height: 3,
            status: ProposalStatus::Reject,
        };
        assert_eq!(err.to_string(), "Proposal for height 3 was not accepted: REJECT");

        let err = HarnessError::InvalidPhase {
            operation: "execute",
            state: DriverState::Idle,
        };
        assert_eq!(err.to_string(), "Cannot execute while the block cycle is idle");
    }
}
