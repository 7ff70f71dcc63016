//! # Error Types for cidstat
//!
//! Unified error handling across all cidstat crates.

use thiserror::Error;

use crate::device::SimulationId;
use crate::run::CalculationId;

/// Main error type for cidstat operations
#[derive(Error, Debug)]
pub enum CalcError {
    /// Group or world device could not be created
    #[error("Topology resolution error: {0}")]
    TopologyResolution(String),

    /// Reducer called without observations (caller bug)
    #[error("Cannot reduce an empty set of observations")]
    EmptyReduction,

    /// Failure reported by the persistence collaborator
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Simulation not found
    #[error("Simulation {0} not found")]
    SimulationNotFound(SimulationId),

    /// Invalid state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Stopped at a timestep boundary on request
    #[error("Calculation {calculation_id} cancelled")]
    Cancelled { calculation_id: CalculationId },

    /// A run aborted; the checkpoint is left for a later resume
    #[error("Calculation for simulation {simulation_id} failed with calculation {calculation_id:?}: {source}")]
    RunFailed {
        simulation_id: SimulationId,
        calculation_id: Option<CalculationId>,
        #[source]
        source: Box<CalcError>,
    },
}

/// Result type for cidstat operations
pub type CalcResult<T> = Result<T, CalcError>;

impl CalcError {
    /// Create a persistence error
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a topology error
    pub fn topology(msg: impl Into<String>) -> Self {
        Self::TopologyResolution(msg.into())
    }

    /// Create a serialization error
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// The innermost error of a failed run
    pub fn root_cause(&self) -> &CalcError {
        match self {
            Self::RunFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
