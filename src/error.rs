//! # error
//!
//! Centralised error type for a single signal run.
//!
//! Every fallible step of a run returns `Result<_, BotError>`.  Nothing in the
//! engine catches these: the coordinator propagates the first failure, the run
//! aborts and the previously persisted position state stays on disk.

use std::fmt;

use thiserror::Error;

/// The external collaborator that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collaborator {
    MarketData,
    Notifier,
    StateStore,
}

impl fmt::Display for Collaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Collaborator::MarketData => write!(f, "market data"),
            Collaborator::Notifier   => write!(f, "notifier"),
            Collaborator::StateStore => write!(f, "state store"),
        }
    }
}

#[derive(Debug, Error)]
pub enum BotError {
    /// Not enough bars (or directional entries) to compute anything.
    #[error("Insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// A fetch, send, load or save against the outside world failed.
    #[error("{collaborator} failure: {message}")]
    CollaboratorFailure {
        collaborator: Collaborator,
        message:      String,
    },
}

impl BotError {
    pub fn market_data(message: impl Into<String>) -> Self {
        Self::CollaboratorFailure {
            collaborator: Collaborator::MarketData,
            message:      message.into(),
        }
    }

    pub fn notifier(message: impl Into<String>) -> Self {
        Self::CollaboratorFailure {
            collaborator: Collaborator::Notifier,
            message:      message.into(),
        }
    }

    pub fn state_store(message: impl Into<String>) -> Self {
        Self::CollaboratorFailure {
            collaborator: Collaborator::StateStore,
            message:      message.into(),
        }
    }

    /// Which collaborator failed, if this is a collaborator failure.
    pub fn collaborator(&self) -> Option<Collaborator> {
        match self {
            BotError::CollaboratorFailure { collaborator, .. } => Some(*collaborator),
            BotError::InsufficientData { .. } => None,
        }
    }
}
