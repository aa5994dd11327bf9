//! Core types for Digistore.
//!
//! This module provides type-safe wrappers for common domain concepts and the
//! JSON models exchanged with the commerce REST API.

pub mod catalog;
pub mod email;
pub mod id;
pub mod order;
pub mod price;
pub mod status;

pub use catalog::{Category, NewCategory, NewProduct, Product};
pub use email::{Email, EmailError};
pub use id::*;
pub use order::{
    CreateOrderRequest, Order, OrderItem, OrderLineRequest, PaymentSession, UpdateOrderStatus,
};
pub use price::{Price, PriceError};
pub use status::OrderStatus;
