//! Errors reported by the simulation engine.

use thiserror::Error;

use crate::simulation::Phase;

/// Error returned by fallible [`Simulation`](crate::Simulation) operations.
#[derive(Debug, Error)]
pub enum SimError {
    /// An entity with the same name has already been added.
    #[error("entity `{0}` is already registered")]
    DuplicateEntity(String),

    /// The operation is not valid in the current simulation phase.
    #[error("simulation is {actual}, the operation requires it to be {expected}")]
    InvalidPhase {
        /// Phase required by the operation.
        expected: Phase,
        /// Phase the simulation is in.
        actual: Phase,
    },

    /// The simulation configuration could not be parsed.
    #[error("invalid simulation config: {0}")]
    Config(#[from] serde_json::Error),
}
