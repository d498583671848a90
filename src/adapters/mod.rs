//! Persistence adapters for the transaction ledger.

pub mod json_file;
pub mod memory;

pub use json_file::JsonFilePersistence;
pub use memory::InMemoryPersistence;
