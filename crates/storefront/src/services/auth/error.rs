//! Authentication error types.

use thiserror::Error;

/// Errors that can occur while signing in to the admin console.
#[derive(Debug, Error)]
pub enum AuthError {
    /// `ADMIN_EMAIL` or `ADMIN_PASSWORD_HASH` is not set.
    #[error("admin console is not configured")]
    NotConfigured,

    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] digistore_core::EmailError),

    /// Wrong email or password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Password too weak to be hashed for use.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
