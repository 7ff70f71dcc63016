//! Picks pending simulations and hands them to the run controller

use std::thread;
use std::time::Duration;

use cidstat_core::{CalcConfig, CalcResult, Simulation, SimulationCatalog, SimulationStore};
use tracing::info;

use crate::controller::{RunController, RunReport};

/// Simulations ready for calculation, lowest id first
pub fn pending<C: SimulationCatalog + ?Sized>(catalog: &mut C) -> CalcResult<Vec<Simulation>> {
    let mut simulations = catalog.pending_simulations()?;
    simulations.sort_by_key(|s| s.id);
    Ok(simulations)
}

/// Run the first pending simulation, `None` when there is nothing to do
pub fn process_next<S>(store: &mut S, config: &CalcConfig) -> CalcResult<Option<RunReport>>
where
    S: SimulationStore + SimulationCatalog + ?Sized,
{
    let Some(simulation) = pending(store)?.into_iter().next() else {
        return Ok(None);
    };

    info!("Selected simulation {} (end time {:?})", simulation.id, simulation.end_time);
    let report = RunController::new(store, config).run(&simulation)?;
    Ok(Some(report))
}

/// Process simulations until idle (run-once mode) or forever
///
/// Returns the reports of every simulation processed. Stops at the first
/// failed run, which stays resumable for the next invocation.
pub fn run_loop<S>(store: &mut S, config: &CalcConfig) -> CalcResult<Vec<RunReport>>
where
    S: SimulationStore + SimulationCatalog + ?Sized,
{
    let mut reports = Vec::new();
    loop {
        match process_next(store, config)? {
            Some(report) => {
                reports.push(report);
                if config.scheduler.run_once {
                    return Ok(reports);
                }
            }
            None if config.scheduler.run_once => {
                info!("No simulation to calculate");
                return Ok(reports);
            }
            None => {
                info!("No simulation to calculate, sleeping {}s", config.scheduler.idle_sleep_secs);
                thread::sleep(Duration::from_secs(config.scheduler.idle_sleep_secs));
            }
        }
    }
}
