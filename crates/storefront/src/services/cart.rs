//! Cart Store.
//!
//! The single source of truth for a visitor's cart. [`CartStore`] wraps the
//! pure [`Cart`] from `digistore-core` and persists it through a
//! [`CartStorage`] adapter after every mutation: one write per call, no
//! batching.
//!
//! Two adapters exist:
//!
//! - [`SessionCartStorage`] keeps the cart in the visitor's tower-sessions
//!   session under [`session_keys::CART`]. Used by every HTTP handler.
//! - [`MemoryCartStorage`] keeps it in a shared in-memory slot. Used by tests.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use rust_decimal::Decimal;
use thiserror::Error;
use tokio::sync::RwLock;
use tower_sessions::Session;

use digistore_core::{Cart, Price, Product, ProductId, QuantityUpdate};

use crate::error::AppError;
use crate::models::session_keys;

/// Errors raised by a cart persistence adapter.
#[derive(Debug, Error)]
pub enum CartStorageError {
    /// The session store rejected a read or write.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// The request carries no session (session layer not installed).
    #[error("no session available for this request")]
    MissingSession,
}

/// Persistence adapter for the Cart Store.
pub trait CartStorage: Send + Sync {
    /// Load the persisted cart, if any.
    fn load(&self) -> impl Future<Output = Result<Option<Cart>, CartStorageError>> + Send;

    /// Replace the persisted cart.
    fn save(&self, cart: &Cart) -> impl Future<Output = Result<(), CartStorageError>> + Send;

    /// Remove the persisted cart entirely.
    fn clear(&self) -> impl Future<Output = Result<(), CartStorageError>> + Send;
}

// =============================================================================
// Session adapter
// =============================================================================

/// Cart persisted in the visitor's session.
#[derive(Clone, Debug)]
pub struct SessionCartStorage {
    session: Session,
}

impl SessionCartStorage {
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }
}

impl CartStorage for SessionCartStorage {
    async fn load(&self) -> Result<Option<Cart>, CartStorageError> {
        match self.session.get::<Cart>(session_keys::CART).await {
            Ok(cart) => Ok(cart),
            // A cart written by an older build or tampered with: start over
            Err(tower_sessions::session::Error::SerdeJson(e)) => {
                tracing::warn!(error = %e, "Discarding unreadable cart from session");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, cart: &Cart) -> Result<(), CartStorageError> {
        self.session.insert(session_keys::CART, cart).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), CartStorageError> {
        self.session.remove_value(session_keys::CART).await?;
        Ok(())
    }
}

// =============================================================================
// In-memory adapter
// =============================================================================

/// Cart persisted in a shared in-memory slot.
///
/// Clones share the same slot, so a test can keep one handle to inspect
/// what a [`CartStore`] persisted.
#[derive(Clone, Debug, Default)]
pub struct MemoryCartStorage {
    slot: Arc<RwLock<Option<Cart>>>,
    writes: Arc<AtomicUsize>,
}

impl MemoryCartStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an already-persisted cart.
    #[must_use]
    pub fn with_cart(cart: Cart) -> Self {
        Self {
            slot: Arc::new(RwLock::new(Some(cart))),
            writes: Arc::default(),
        }
    }

    /// Current persisted state.
    pub async fn snapshot(&self) -> Option<Cart> {
        self.slot.read().await.clone()
    }

    /// Number of writes (`save` or `clear`) performed so far.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl CartStorage for MemoryCartStorage {
    async fn load(&self) -> Result<Option<Cart>, CartStorageError> {
        Ok(self.slot.read().await.clone())
    }

    async fn save(&self, cart: &Cart) -> Result<(), CartStorageError> {
        *self.slot.write().await = Some(cart.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn clear(&self) -> Result<(), CartStorageError> {
        *self.slot.write().await = None;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// =============================================================================
// Cart Store
// =============================================================================

/// A visitor's cart together with where it is persisted.
#[derive(Debug)]
pub struct CartStore<S> {
    storage: S,
    cart: Cart,
}

impl<S: CartStorage> CartStore<S> {
    /// Restore the persisted cart, or start with an empty one.
    ///
    /// # Errors
    ///
    /// Returns `CartStorageError` if the adapter cannot be read.
    pub async fn open(storage: S) -> Result<Self, CartStorageError> {
        let cart = storage.load().await?.unwrap_or_default();
        Ok(Self { storage, cart })
    }

    /// Current cart contents.
    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    /// Add one unit of `product`, returning the entry's new quantity.
    ///
    /// # Errors
    ///
    /// Returns `CartStorageError` if the cart cannot be persisted.
    pub async fn add_to_cart(&mut self, product: &Product) -> Result<u32, CartStorageError> {
        let quantity = self.cart.add(product);
        self.storage.save(&self.cart).await?;
        Ok(quantity)
    }

    /// Set an entry's quantity. Zero removes the entry.
    ///
    /// # Errors
    ///
    /// Returns `CartStorageError` if the cart cannot be persisted.
    pub async fn update_quantity(
        &mut self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<QuantityUpdate, CartStorageError> {
        let outcome = self.cart.update_quantity(product_id, quantity);
        self.storage.save(&self.cart).await?;
        Ok(outcome)
    }

    /// Remove an entry. Removing an absent product is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `CartStorageError` if the cart cannot be persisted.
    pub async fn remove_from_cart(
        &mut self,
        product_id: &ProductId,
    ) -> Result<bool, CartStorageError> {
        let removed = self.cart.remove(product_id);
        self.storage.save(&self.cart).await?;
        Ok(removed)
    }

    /// Empty the cart and drop its persisted state.
    ///
    /// # Errors
    ///
    /// Returns `CartStorageError` if the persisted state cannot be removed.
    pub async fn clear_cart(&mut self) -> Result<(), CartStorageError> {
        self.cart.clear();
        self.storage.clear().await
    }

    /// Sum of all quantities.
    #[must_use]
    pub fn total_items(&self) -> u32 {
        self.cart.total_items()
    }

    /// Sum of `price x quantity`, unrounded.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.cart.total_price()
    }

    /// Total price as a displayable [`Price`].
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.cart.subtotal()
    }
}

/// Handlers take `CartStore<SessionCartStorage>` directly.
impl<St> FromRequestParts<St> for CartStore<SessionCartStorage>
where
    St: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &St) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(CartStorageError::MissingSession)?;

        Ok(Self::open(SessionCartStorage::new(session)).await?)
    }
}
