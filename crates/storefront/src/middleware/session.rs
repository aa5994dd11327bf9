//! Session middleware configuration.
//!
//! Sessions hold the cart, the pending checkout and the admin login marker.
//! They live in `PostgreSQL` when a database URL is configured and in memory
//! otherwise. The memory store is for local development only: it never evicts
//! expired sessions, so it grows for as long as the process runs.

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use tokio::task::JoinHandle;
use tower_sessions::{
    ExpiredDeletion, Expiry, MemoryStore, SessionManagerLayer, SessionStore, session_store,
};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "digistore_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Where sessions are stored.
#[derive(Debug, Clone)]
pub enum SessionBackend {
    /// `PostgreSQL` table managed by `tower-sessions-sqlx-store`.
    Postgres(PostgresStore),
    /// Process memory; sessions are lost on restart.
    ///
    /// Development only. Expired sessions are never removed.
    Memory(MemoryStore),
}

impl SessionBackend {
    /// Pick the backend from configuration.
    ///
    /// The sessions table must already exist
    /// (`digistore-cli migrate sessions`).
    ///
    /// # Errors
    ///
    /// Returns `sqlx::Error` if the database cannot be reached.
    pub async fn from_config(config: &StorefrontConfig) -> Result<Self, sqlx::Error> {
        match &config.database_url {
            Some(url) => {
                let pool = PgPool::connect(url.expose_secret()).await?;
                tracing::info!("Using PostgreSQL session store");
                Ok(Self::Postgres(PostgresStore::new(pool)))
            }
            None => {
                tracing::warn!(
                    "No database configured, sessions are kept in memory (unbounded, dev only)"
                );
                Ok(Self::memory())
            }
        }
    }

    #[must_use]
    pub fn memory() -> Self {
        Self::Memory(MemoryStore::default())
    }

    /// Start the background task that deletes expired sessions every `period`.
    ///
    /// Returns `None` for the memory store, which has no deletion support.
    #[must_use]
    pub fn spawn_expired_deletion(
        &self,
        period: Duration,
    ) -> Option<JoinHandle<Result<(), session_store::Error>>> {
        match self {
            Self::Postgres(store) => {
                tracing::info!(period_secs = period.as_secs(), "Expired session cleanup started");
                Some(tokio::spawn(store.clone().continuously_delete_expired(period)))
            }
            Self::Memory(_) => None,
        }
    }
}

/// Create the session layer for a store.
#[must_use]
pub fn create_session_layer<S>(store: S, config: &StorefrontConfig) -> SessionManagerLayer<S>
where
    S: SessionStore + Clone,
{
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
