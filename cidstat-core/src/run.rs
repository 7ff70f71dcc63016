//! # Runs - Simulations and Their Calculations
//!
//! A calculation is persisted as `(status, current_time, current_iteration)`.
//! Resuming is re-entering `Running` at that checkpoint, nothing more.

use serde::{Deserialize, Serialize};

use crate::device::SimulationId;

pub type CalculationId = u64;

/// Lifecycle of the simulation that produced the messages
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimulationStatus {
    Pending,
    Running,
    /// Message generation finished, ready for calculation
    Processed,
}

/// A simulation as seen by the calculator
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Simulation {
    pub id: SimulationId,
    pub status: SimulationStatus,
    /// Last simulated second, `None` while the simulation is still running
    pub end_time: Option<f64>,
}

impl Simulation {
    pub fn processed(id: SimulationId, end_time: f64) -> Self {
        Self {
            id,
            status: SimulationStatus::Processed,
            end_time: Some(end_time),
        }
    }
}

/// Persisted status of a calculation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Started,
    Failed,
    Completed,
}

impl RunStatus {
    /// Started and failed runs are picked up again from their checkpoint
    pub fn is_resumable(self) -> bool {
        matches!(self, RunStatus::Started | RunStatus::Failed)
    }
}

/// One resumable execution over a simulation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalculationRun {
    pub id: CalculationId,
    pub simulation_id: SimulationId,
    pub timestep_seconds: f64,
    /// Start of the last checkpointed timestep
    pub current_time: f64,
    pub current_iteration: u64,
    pub status: RunStatus,
    /// Whether any checkpoint has been written yet
    #[serde(default)]
    pub checkpointed: bool,
}

impl CalculationRun {
    pub fn new(id: CalculationId, simulation_id: SimulationId, timestep_seconds: f64) -> Self {
        Self {
            id,
            simulation_id,
            timestep_seconds,
            current_time: 0.0,
            current_iteration: 0,
            status: RunStatus::Started,
            checkpointed: false,
        }
    }

    /// No timestep has been made durable yet
    pub fn is_fresh(&self) -> bool {
        !self.checkpointed
    }
}
