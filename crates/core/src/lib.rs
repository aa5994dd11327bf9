//! Digistore Core - Shared types library.
//!
//! This crate provides the domain types used across all Digistore components:
//! - `storefront` - Public-facing shop and admin console
//! - `cli` - Command-line tools for sessions and admin credentials
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no HTTP
//! clients, no session access. This keeps it lightweight and allows the cart
//! rules to be tested in isolation.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices, emails, statuses and the wire models
//! - [`cart`] - Shopping cart semantics (quantity aggregation, totals)

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod types;

pub use cart::{Cart, CartItem, QuantityUpdate};
pub use types::*;
