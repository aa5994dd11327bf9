//! Admin console authentication.
//!
//! A single administrator is configured through `ADMIN_EMAIL` and
//! `ADMIN_PASSWORD_HASH` (an Argon2 PHC string, see
//! `digistore-cli admin hash-password`). Nothing else grants access.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use secrecy::ExposeSecret;

use digistore_core::Email;

use crate::config::AdminConfig;
use crate::models::CurrentAdmin;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 12;

/// Verifies admin console credentials.
pub struct AdminAuthService<'a> {
    config: &'a AdminConfig,
}

impl<'a> AdminAuthService<'a> {
    #[must_use]
    pub const fn new(config: &'a AdminConfig) -> Self {
        Self { config }
    }

    /// Check an email/password pair against the configured administrator.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotConfigured` if no administrator is configured,
    /// `AuthError::InvalidEmail` if the email cannot be parsed and
    /// `AuthError::InvalidCredentials` on any mismatch.
    pub fn login(&self, email: &str, password: &str) -> Result<CurrentAdmin, AuthError> {
        let (Some(admin_email), Some(hash)) = (&self.config.email, &self.config.password_hash)
        else {
            return Err(AuthError::NotConfigured);
        };

        let email = Email::parse(email)?;

        // Hash check runs before the email comparison so both failures cost the same
        let password_ok = verify_password(password, hash.expose_secret()).is_ok();
        if !password_ok || !admin_email.matches(&email) {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(CurrentAdmin::new(admin_email.clone()))
    }
}

/// Validate password strength requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` if the password is too short, or
/// `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    validate_password(password)?;

    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
