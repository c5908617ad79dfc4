//! Market data providers
//!
//! - Dexscreener: public pair data over HTTP
//! - Fixtures: snapshots read from a local directory

pub mod dexscreener;
pub mod file_adapter;

pub use dexscreener::DexscreenerAdapter;
pub use file_adapter::FileSnapshotAdapter;
