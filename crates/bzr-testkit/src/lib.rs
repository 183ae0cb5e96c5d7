//! In-memory collaborators and fixtures for exercising the purchase core
//! without Postgres or a file service.

pub mod files;
pub mod fixtures;
pub mod memory_store;

pub use files::MemoryFileResolver;
pub use fixtures::Harness;
pub use memory_store::{MemoryState, MemoryStore};
