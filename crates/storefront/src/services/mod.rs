//! Business logic services for storefront.
//!
//! # Services
//!
//! - `auth` - Admin console credential verification (Argon2)
//! - `cart` - Cart Store and its persistence adapters
//! - `checkout` - Order creation and payment hand-off

pub mod auth;
pub mod cart;
pub mod checkout;

pub use cart::{CartStorage, CartStorageError, CartStore, MemoryCartStorage, SessionCartStorage};
pub use checkout::{CheckoutError, CheckoutService, PaymentHandoff};
