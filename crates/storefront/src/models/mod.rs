//! Session-held models for the storefront.

mod session;

pub use session::{CurrentAdmin, Flash, FlashKind, keys as session_keys};
