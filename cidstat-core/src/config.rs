//! # Configuration
//!
//! Parameters for the calculator, its store and the scheduler loop.
//! Loaded from JSON, then overridden from `CIDSTAT_*` environment variables.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{CalcError, CalcResult};
use crate::DEFAULT_TIMESTEP_SECONDS;

/// Master configuration for cidstat
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CalcConfig {
    /// Time stepping
    #[serde(default)]
    pub calculation: CalculationConfig,

    /// Where results and checkpoints live
    #[serde(default)]
    pub storage: StorageConfig,

    /// Pending-simulation polling
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Log output
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Time stepping
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CalculationConfig {
    /// Simulated seconds per timestep
    pub timestep_seconds: f64,

    /// Log progress at info level every N iterations (0 = never)
    pub log_every: u64,
}

impl Default for CalculationConfig {
    fn default() -> Self {
        Self {
            timestep_seconds: DEFAULT_TIMESTEP_SECONDS,
            log_every: 50,
        }
    }
}

/// Store location
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// bincode snapshot of all simulations, devices, messages and results
    pub path: PathBuf,

    /// JSON fixture merged into the store at startup
    pub import_path: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/cidstat.store"),
            import_path: None,
        }
    }
}

/// Scheduler loop
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Sleep when nothing is pending (seconds)
    pub idle_sleep_secs: u64,

    /// Process at most one simulation and exit
    pub run_once: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            idle_sleep_secs: 5 * 60,
            run_once: true,
        }
    }
}

/// Log output
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing` filter directive, e.g. `info` or `cidstat_calc=debug`
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl CalcConfig {
    /// Load configuration from file
    pub fn load(path: &str) -> CalcResult<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| CalcError::config(format!("{}: {}", path, e)))
    }

    /// Save configuration to file
    pub fn save(&self, path: &str) -> CalcResult<()> {
        let content = serde_json::to_string_pretty(self).map_err(|e| CalcError::serialization(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Create config from environment variables
    ///
    /// Reads:
    /// - CIDSTAT_CONFIG: JSON config file to start from (default: built-in defaults)
    /// - CIDSTAT_TIMESTEP: Seconds per timestep (default: 20)
    /// - CIDSTAT_STORE: Store snapshot path (default: data/cidstat.store)
    /// - CIDSTAT_IMPORT: JSON fixture to import at startup
    /// - CIDSTAT_IDLE_SECS: Sleep when nothing is pending (default: 300)
    /// - CIDSTAT_RUN_ONCE: "1"/"true" to exit after one simulation (default: true)
    /// - CIDSTAT_LOG: Log filter (default: info)
    pub fn from_env() -> CalcResult<Self> {
        let mut config = match std::env::var("CIDSTAT_CONFIG") {
            Ok(path) => Self::load(&path)?,
            Err(_) => Self::default(),
        };

        if let Ok(val) = std::env::var("CIDSTAT_TIMESTEP") {
            config.calculation.timestep_seconds = val
                .parse()
                .map_err(|_| CalcError::config(format!("CIDSTAT_TIMESTEP is not a number: {}", val)))?;
        }
        if let Ok(val) = std::env::var("CIDSTAT_STORE") {
            config.storage.path = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("CIDSTAT_IMPORT") {
            config.storage.import_path = Some(PathBuf::from(val));
        }
        if let Ok(val) = std::env::var("CIDSTAT_IDLE_SECS") {
            match val.parse() {
                Ok(v) => config.scheduler.idle_sleep_secs = v,
                Err(_) => tracing::warn!("Ignoring CIDSTAT_IDLE_SECS={}, keeping {}s", val, config.scheduler.idle_sleep_secs),
            }
        }
        if let Ok(val) = std::env::var("CIDSTAT_RUN_ONCE") {
            config.scheduler.run_once = val == "1" || val.to_lowercase() == "true";
        }
        if let Ok(val) = std::env::var("CIDSTAT_LOG") {
            config.logging.level = val;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject values the calculator cannot run with
    pub fn validate(&self) -> CalcResult<()> {
        let step = self.calculation.timestep_seconds;
        if !step.is_finite() || step <= 0.0 {
            return Err(CalcError::config(format!("timestep must be a positive number of seconds, got {}", step)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = CalcConfig::default();
        assert_eq!(config.calculation.timestep_seconds, 20.0);
        assert!(config.scheduler.run_once);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cidstat.json");
        let path = path.to_str().unwrap();

        let mut config = CalcConfig::default();
        config.calculation.timestep_seconds = 5.0;
        config.storage.import_path = Some(PathBuf::from("fixtures/sim.json"));
        config.save(path).unwrap();

        let loaded = CalcConfig::load(path).unwrap();
        assert_eq!(loaded.calculation.timestep_seconds, 5.0);
        assert_eq!(loaded.storage.import_path, Some(PathBuf::from("fixtures/sim.json")));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("partial.json");
        std::fs::write(&path, r#"{ "logging": { "level": "debug" } }"#).unwrap();

        let loaded = CalcConfig::load(path.to_str().unwrap()).unwrap();
        assert_eq!(loaded.logging.level, "debug");
        assert_eq!(loaded.calculation.timestep_seconds, 20.0);
    }

    #[test]
    fn test_rejects_bad_timestep() {
        let mut config = CalcConfig::default();
        config.calculation.timestep_seconds = 0.0;
        assert!(matches!(config.validate(), Err(CalcError::Config(_))));

        config.calculation.timestep_seconds = f64::NAN;
        assert!(config.validate().is_err());
    }
}
