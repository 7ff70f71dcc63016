//! Runtime setup: logging and the startup banner

use cidstat_core::CalcConfig;
use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber
///
/// `RUST_LOG` wins over the configured level. An unparsable level falls
/// back to `info`.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

/// Print startup banner with config info
pub fn print_banner(config: &CalcConfig) {
    println!();
    println!("╔══════════════════════════════════════════════════════════╗");
    println!("║          cidstat-calc - circular statistics              ║");
    println!("╠══════════════════════════════════════════════════════════╣");
    println!("║  Timestep: {:>8}s                                     ║", config.calculation.timestep_seconds);
    println!("║  Store: {}", config.storage.path.display());
    if let Some(import) = &config.storage.import_path {
        println!("║  Import: {}", import.display());
    }
    println!(
        "║  Mode: {:>11}                                       ║",
        if config.scheduler.run_once { "run-once" } else { "loop" }
    );
    println!("╚══════════════════════════════════════════════════════════╝");
    println!();
}
