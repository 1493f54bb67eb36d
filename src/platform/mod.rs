//! Platform abstraction layer
//!
//! Handles browser/native differences for storage (LocalStorage on web, an
//! in-memory map elsewhere).

pub mod storage;

#[cfg(target_arch = "wasm32")]
pub use storage::LocalStorageStore;
pub use storage::{KeyValueStore, MemoryStore};
