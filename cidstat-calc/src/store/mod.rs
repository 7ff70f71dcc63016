//! Stores implementing the persistence traits
//!
//! - `MemoryStore`: ordered maps, used by tests and as the snapshot format
//! - `FileStore`: `MemoryStore` persisted with bincode after every write

mod file;
mod memory;

pub use file::{FileStore, Fixture};
pub use memory::{MemoryStore, STORE_VERSION};
