//! Implementations of the domain ports: entity stores, the read-through
//! cache and the IP region table.

pub mod cache;
pub mod memory;
pub mod region;
#[cfg(feature = "db-sqlite")]
pub mod sqlite;

pub use cache::CachedStore;
pub use memory::MemoryStore;
pub use region::RegionTable;
#[cfg(feature = "db-sqlite")]
pub use sqlite::SqliteStore;
