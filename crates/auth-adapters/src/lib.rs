//! # auth-adapters
//!
//! Argon2-based implementation of [`AdminVerifier`].
//! The admin token is never stored; only its PHC-formatted Argon2 hash is
//! kept in configuration.

use argon2::{
    password_hash::{PasswordHash, PasswordVerifier},
    Argon2,
};
use async_trait::async_trait;
use domains::AdminVerifier;
use tracing::warn;

pub struct Argon2AdminVerifier {
    token_hash: Option<String>,
}

impl Argon2AdminVerifier {
    /// Without a hash every token is rejected and admin routes stay closed.
    pub fn new(token_hash: Option<String>) -> Self {
        Self { token_hash }
    }

    pub fn is_configured(&self) -> bool {
        self.token_hash.is_some()
    }
}

#[async_trait]
impl AdminVerifier for Argon2AdminVerifier {
    /// Verifies the presented bearer token against the stored Argon2 hash.
    async fn verify_admin_token(&self, token: &str) -> bool {
        let Some(hash) = self.token_hash.as_deref() else {
            return false;
        };
        let parsed_hash = match PasswordHash::new(hash) {
            Ok(p) => p,
            Err(err) => {
                warn!(error = %err, "configured admin token hash is not a valid PHC string");
                return false;
            }
        };
        Argon2::default()
            .verify_password(token.as_bytes(), &parsed_hash)
            .is_ok()
    }
}
