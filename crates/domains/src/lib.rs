//! The central domain types and interface definitions for Rusty-Talk.

pub mod errors;
pub mod models;
pub mod ports;
pub mod query;

// Re-exporting for easier access in other crates
pub use errors::*;
pub use models::*;
pub use ports::*;
pub use query::*;
