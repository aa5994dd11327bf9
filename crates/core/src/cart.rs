//! Shopping cart semantics.
//!
//! A [`Cart`] is an ordered list of `(product snapshot, quantity)` pairs with
//! at most one entry per product id. Every entry has a quantity of at least
//! one: dropping a quantity to zero removes the entry instead of keeping it.
//!
//! This module is pure; where the cart is persisted is decided by the
//! storefront's cart store.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{CreateOrderRequest, Email, OrderLineRequest, Price, Product, ProductId};

/// A product in the cart together with how many units the visitor wants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Copy of the product taken when it was first added.
    pub product: Product,
    quantity: u32,
}

impl CartItem {
    fn new(product: Product) -> Self {
        Self {
            product,
            quantity: 1,
        }
    }

    /// Units of this product in the cart (always at least 1).
    #[must_use]
    pub const fn quantity(&self) -> u32 {
        self.quantity
    }

    /// `price x quantity` for this entry.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product.price * self.quantity
    }
}

/// Outcome of [`Cart::update_quantity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityUpdate {
    /// The entry now holds this quantity.
    Updated(u32),
    /// A quantity of zero was requested, so the entry was removed.
    Removed,
    /// The product was not in the cart; nothing changed.
    NotInCart,
}

/// The visitor's shopping cart.
///
/// Serialises as a plain JSON array of items. Deserialising normalises the
/// input: zero-quantity entries are dropped and duplicate product ids are
/// merged, so a tampered or stale persisted cart still upholds the
/// invariants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<CartItem>", into = "Vec<CartItem>")]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Entries in the order they were first added.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Whether the cart has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up the entry for a product.
    #[must_use]
    pub fn get(&self, product_id: &ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| &item.product.id == product_id)
    }

    fn position(&self, product_id: &ProductId) -> Option<usize> {
        self.items
            .iter()
            .position(|item| &item.product.id == product_id)
    }

    /// Add one unit of `product`.
    ///
    /// An existing entry for the same product id is incremented (its snapshot
    /// is kept as-is); otherwise a new entry with quantity 1 is appended.
    /// Returns the entry's new quantity.
    pub fn add(&mut self, product: &Product) -> u32 {
        if let Some(item) = self
            .items
            .iter_mut()
            .find(|item| item.product.id == product.id)
        {
            item.quantity = item.quantity.saturating_add(1);
            return item.quantity;
        }

        self.items.push(CartItem::new(product.clone()));
        1
    }

    /// Set the quantity of an entry. A quantity of zero removes it.
    pub fn update_quantity(&mut self, product_id: &ProductId, quantity: u32) -> QuantityUpdate {
        let Some(index) = self.position(product_id) else {
            return QuantityUpdate::NotInCart;
        };

        if quantity == 0 {
            self.items.remove(index);
            return QuantityUpdate::Removed;
        }

        match self.items.get_mut(index) {
            Some(item) => {
                item.quantity = quantity;
                QuantityUpdate::Updated(quantity)
            }
            None => QuantityUpdate::NotInCart,
        }
    }

    /// Remove the entry for a product. Returns `false` if it was not present.
    pub fn remove(&mut self, product_id: &ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| &item.product.id != product_id);
        self.items.len() != before
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Sum of all quantities (the navigation badge count).
    #[must_use]
    pub fn total_items(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |acc, item| acc.saturating_add(item.quantity))
    }

    /// Sum of `price x quantity` over all entries, unrounded.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.subtotal().amount()
    }

    /// [`Cart::total_price`] as a [`Price`], for display.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Build the `POST /orders` payload for this cart.
    #[must_use]
    pub fn order_request(&self, customer_email: Email) -> CreateOrderRequest {
        CreateOrderRequest {
            items: self
                .items
                .iter()
                .map(|item| OrderLineRequest {
                    product_id: item.product.id.clone(),
                    quantity: item.quantity,
                })
                .collect(),
            customer_email,
        }
    }
}

impl From<Vec<CartItem>> for Cart {
    fn from(items: Vec<CartItem>) -> Self {
        let mut cart = Self::new();
        for item in items.into_iter().filter(|item| item.quantity > 0) {
            match cart
                .items
                .iter_mut()
                .find(|existing| existing.product.id == item.product.id)
            {
                Some(existing) => {
                    existing.quantity = existing.quantity.saturating_add(item.quantity);
                }
                None => cart.items.push(item),
            }
        }
        cart
    }
}

impl From<Cart> for Vec<CartItem> {
    fn from(cart: Cart) -> Self {
        cart.items
    }
}
