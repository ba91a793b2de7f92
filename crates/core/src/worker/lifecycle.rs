//! Worker lifecycle states.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Lifecycle of one worker instance.
///
/// `Installing → Waiting → Activating → Active`. A failed install, or a
/// newer instance taking over, ends in `Redundant`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Installing,
    /// Installed, waiting to activate.
    Waiting,
    Activating,
    /// Controlling clients and intercepting fetches.
    Active,
    Redundant,
}

impl WorkerState {
    pub fn can_intercept_fetch(&self) -> bool {
        matches!(self, WorkerState::Active)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkerState::Redundant)
    }

    /// Check that a handler may start from this state.
    pub(crate) fn expect(&self, expected: WorkerState, handler: &str) -> Result<(), Error> {
        if *self == expected {
            Ok(())
        } else {
            Err(Error::InvalidState(format!("{handler} requires state {expected}, worker is {self}")))
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkerState::Installing => "installing",
            WorkerState::Waiting => "waiting",
            WorkerState::Activating => "activating",
            WorkerState::Active => "active",
            WorkerState::Redundant => "redundant",
        };
        f.write_str(s)
    }
}
