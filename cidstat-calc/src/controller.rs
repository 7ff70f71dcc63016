//! # Run Controller
//!
//! Drives one calculation from its checkpoint to the simulation's end time.
//!
//! ```text
//! Uninitialized ──start/resume──▶ Running ──loop done──▶ Completed
//!                                    │
//!                                    └──error──▶ Failed
//! ```
//!
//! Each timestep is aggregate → write results → checkpoint → advance. The
//! checkpoint is durable before time moves on, and a resume re-enters
//! `Running` at the checkpointed step, recomputing it. Result writes are
//! upserts, so the repeat is harmless.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cidstat_core::{CalcConfig, CalcError, CalcResult, CalculationId, CalculationRun, Simulation, SimulationStore, TimeWindow};
use tracing::{debug, error, info, warn};

use crate::aggregator::TimestepAggregator;
use crate::topology::DeviceTopology;

/// Where the controller is in its lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Uninitialized,
    Running,
    Completed,
    Failed,
}

/// Outcome of a finished run
#[derive(Clone, Debug, PartialEq)]
pub struct RunReport {
    pub calculation_id: CalculationId,
    /// Timesteps executed by this invocation
    pub iterations: u64,
    pub results_written: usize,
    /// Start of the last executed timestep
    pub final_time: f64,
    /// Whether this invocation picked up an earlier checkpoint
    pub resumed: bool,
}

pub struct RunController<'s, S: SimulationStore + ?Sized> {
    store: &'s mut S,
    timestep_seconds: f64,
    log_every: u64,
    state: RunState,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'s, S: SimulationStore + ?Sized> RunController<'s, S> {
    pub fn new(store: &'s mut S, config: &CalcConfig) -> Self {
        Self {
            store,
            timestep_seconds: config.calculation.timestep_seconds,
            log_every: config.calculation.log_every,
            state: RunState::Uninitialized,
            cancel: None,
        }
    }

    /// Stop at the next timestep boundary once `flag` is set
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Start or resume the calculation of `simulation` and run it to the end
    pub fn run(&mut self, simulation: &Simulation) -> CalcResult<RunReport> {
        let failed = |calculation_id, source| CalcError::RunFailed {
            simulation_id: simulation.id,
            calculation_id,
            source: Box::new(source),
        };

        let Some(end_time) = simulation.end_time else {
            self.state = RunState::Failed;
            return Err(failed(
                None,
                CalcError::InvalidState(format!("simulation {} has no end time", simulation.id)),
            ));
        };

        if !(self.timestep_seconds.is_finite() && self.timestep_seconds > 0.0) {
            self.state = RunState::Failed;
            return Err(failed(
                None,
                CalcError::InvalidState(format!("timestep must be positive, got {}", self.timestep_seconds)),
            ));
        }

        // Without a calculation row there is nothing to checkpoint against
        let run = match self.store.load_or_create_run(simulation, self.timestep_seconds) {
            Ok(run) => run,
            Err(e) => {
                self.state = RunState::Failed;
                error!("Registering calculation for simulation {} failed: {}", simulation.id, e);
                return Err(failed(None, e));
            }
        };

        if run.is_fresh() {
            info!("Calculating simulation {} (calculation {})", simulation.id, run.id);
        } else {
            info!(
                "Resuming simulation {} (calculation {}) at t={} iteration {}",
                simulation.id, run.id, run.current_time, run.current_iteration
            );
        }
        self.state = RunState::Running;

        match self.drive(&run, end_time) {
            Ok(report) => {
                self.state = RunState::Completed;
                info!(
                    "Calculated simulation {} (calculation {}): {} timesteps, {} results",
                    simulation.id, run.id, report.iterations, report.results_written
                );
                Ok(report)
            }
            Err(e @ CalcError::Cancelled { .. }) => {
                // Checkpoint and status untouched, the run resumes later
                warn!("Calculation {} cancelled at a timestep boundary", run.id);
                Err(e)
            }
            Err(e) => {
                self.state = RunState::Failed;
                error!(
                    "Calculation for simulation {} failed with calculation {}: {}",
                    simulation.id, run.id, e
                );
                if let Err(mark) = self.store.mark_failed(run.id) {
                    warn!("Could not mark calculation {} as failed: {}", run.id, mark);
                }
                Err(failed(Some(run.id), e))
            }
        }
    }

    fn drive(&mut self, run: &CalculationRun, end_time: f64) -> CalcResult<RunReport> {
        let topology = DeviceTopology::resolve(&mut *self.store, run.simulation_id)?;
        let aggregator = TimestepAggregator::new(&topology);

        // A resumed run keeps the step it was started with
        let step = run.timestep_seconds;
        let mut current_time = run.current_time;
        let mut current_iteration = run.current_iteration;

        let mut report = RunReport {
            calculation_id: run.id,
            iterations: 0,
            results_written: 0,
            final_time: current_time,
            resumed: !run.is_fresh(),
        };

        while current_time <= end_time {
            if self.is_cancelled() {
                return Err(CalcError::Cancelled { calculation_id: run.id });
            }

            let window = TimeWindow::starting_at(current_time, step);
            let results = aggregator.aggregate(&mut *self.store, window, current_iteration)?;

            debug!("Time: {}\titeration: {}\tupdates: {}", current_time, current_iteration, results.len());
            if self.log_every > 0 && current_iteration % self.log_every == 0 {
                info!("Calculation {}: t={} / {} ({} updates)", run.id, current_time, end_time, results.len());
            }

            if !results.is_empty() {
                self.store.write_results(run.id, &results)?;
            }
            self.store.checkpoint(run.id, current_time, current_iteration)?;

            report.iterations += 1;
            report.results_written += results.len();
            report.final_time = current_time;

            current_time += step;
            current_iteration += 1;
        }

        self.store.post_aggregate(run.id)?;
        self.store.mark_completed(run.id)?;
        Ok(report)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}
