//! Admin credential commands.
//!
//! The admin console has a single operator configured through
//! `ADMIN_EMAIL` and `ADMIN_PASSWORD_HASH`. This command produces the hash.

use std::io::BufRead;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use digistore_storefront::services::auth::{self, AuthError};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Could not read the password from stdin.
    #[error("Failed to read password: {0}")]
    Io(#[from] std::io::Error),

    /// Password rejected or hashing failed.
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Hash a password and print it to stdout.
///
/// # Errors
///
/// Returns `AdminError` if stdin cannot be read or the password is too weak.
pub fn hash_password(password: Option<String>) -> Result<(), AdminError> {
    let password = match password {
        Some(password) => SecretString::from(password),
        None => read_password()?,
    };

    let hash = auth::hash_password(password.expose_secret())?;

    #[allow(clippy::print_stdout)]
    {
        println!("{hash}");
    }
    tracing::info!("Set ADMIN_PASSWORD_HASH to the value above");

    Ok(())
}

fn read_password() -> Result<SecretString, AdminError> {
    tracing::info!("Enter the admin password followed by a newline:");
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(SecretString::from(
        line.trim_end_matches(['\r', '\n']).to_string(),
    ))
}
