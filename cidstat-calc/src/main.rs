//! cidstat-calc - circular statistics over simulated device hierarchies
//!
//! Picks a processed simulation, walks it in fixed timesteps and writes one
//! circular summary per device, group and world for every step. Progress is
//! checkpointed after each step, so an interrupted run resumes where it
//! stopped.

use std::process::ExitCode;

use cidstat_calc::config::{init_logging, print_banner};
use cidstat_calc::{scheduler, FileStore};
use cidstat_core::{CalcConfig, CalcResult};
use tracing::{error, info};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> ExitCode {
    let config = match CalcConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("cidstat-calc: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config.logging.level);
    print_banner(&config);
    info!("cidstat-calc v{}", VERSION);

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(config: &CalcConfig) -> CalcResult<()> {
    let mut store = FileStore::open(&config.storage.path)?;

    if let Some(path) = &config.storage.import_path {
        store.import_json(path)?;
    }

    let reports = scheduler::run_loop(&mut store, config)?;
    for report in &reports {
        info!(
            "Calculation {}: {} timesteps, {} results, last t={}{}",
            report.calculation_id,
            report.iterations,
            report.results_written,
            report.final_time,
            if report.resumed { " (resumed)" } else { "" }
        );
    }
    Ok(())
}
