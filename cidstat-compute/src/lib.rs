//! # cidstat Compute
//!
//! The numeric heart of the calculator:
//! - **dedup**: one observation per `(emitter, value)` and timestep
//! - **reducer**: vector-sum circular statistics over a set of CIDs
//!
//! Both are pure functions over slices. Storage, time stepping and the
//! device hierarchy live in `cidstat-calc`.

pub mod dedup;
pub mod reducer;

pub use dedup::deduplicate;
pub use reducer::{reduce, reduce_observations, vector_sum, CircularSummary, DEGENERATE_LENGTH};
