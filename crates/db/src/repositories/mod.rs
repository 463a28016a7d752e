//! Storage backends implementing `storefront_core::storage::StorageAdapter`.
//!
//! - `SqlStorage`: SQLite, one row per product and one JSON document per cart.
//! - `FileStorage`: two JSON array files rewritten wholesale on every write.
//! - `InMemoryStorage`: process-local, for tests and throwaway runs.

pub mod file;
pub mod memory;
pub mod sql;

pub use file::FileStorage;
pub use memory::InMemoryStorage;
pub use sql::SqlStorage;
