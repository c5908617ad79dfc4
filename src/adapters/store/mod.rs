//! Signal store implementations

mod state;
pub mod memory;
pub mod json_file;

pub use memory::InMemorySignalStore;
pub use json_file::{JsonFileSignalStore, DEFAULT_STORE_FILE};
