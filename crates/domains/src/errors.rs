//! # DomainError
//!
//! Centralized error handling for the comment backend.
//! Adapters map their own failures into these variants.

use std::fmt::Display;

use thiserror::Error;

/// The primary error type for all domain and service operations.
#[derive(Error, Debug)]
pub enum DomainError {
    /// Entity absent (site, page, user, comment)
    #[error("{entity} not found with ID {id}")]
    NotFound { entity: &'static str, id: String },

    /// Malformed or missing request parameters
    #[error("validation error: {0}")]
    Validation(String),

    /// Caller lacks the privilege required for the operation
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// The entity store could not complete a query
    #[error("storage failure: {0}")]
    Store(String),

    /// IP geolocation lookup failed
    #[error("ip region lookup failed: {0}")]
    Enrichment(String),

    #[error("cache disabled")]
    CacheDisabled,

    /// Resource already exists (e.g. duplicate site name)
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn store(err: impl Display) -> Self {
        Self::Store(err.to_string())
    }
}

/// A specialized Result type for domain logic.
pub type DomainResult<T> = std::result::Result<T, DomainError>;
