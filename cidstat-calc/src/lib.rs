//! # cidstat-calc
//!
//! Resumable circular statistics over simulated device hierarchies.
//!
//! A run walks a processed simulation in fixed timesteps. Every step reduces
//! the observations received by each local device, then the pooled raw
//! observations of each group, then of the whole world:
//!
//! ```text
//! scheduler ──▶ RunController ──▶ DeviceTopology (once)
//!                    │
//!                    └──▶ TimestepAggregator ──▶ dedup ──▶ reduce
//!                    │
//!                    └──▶ write results ──▶ checkpoint ──▶ next step
//! ```

pub mod aggregator;
pub mod config;
pub mod controller;
pub mod scheduler;
pub mod store;
pub mod summary;
pub mod topology;

pub use aggregator::{summarize_device, TimestepAggregator};
pub use controller::{RunController, RunReport, RunState};
pub use store::{FileStore, Fixture, MemoryStore, STORE_VERSION};
pub use topology::DeviceTopology;
