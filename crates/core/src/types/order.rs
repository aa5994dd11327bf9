//! Order models and the payloads used to create and pay for them.
//!
//! Orders are server-side entities. The storefront builds a
//! [`CreateOrderRequest`] from the cart and otherwise only displays what the
//! API returns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::catalog::Product;
use super::email::Email;
use super::id::{OrderId, OrderItemId, ProductId};
use super::price::Price;
use super::status::OrderStatus;

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub customer_email: Email,
    pub total_amount: Price,
    pub status: OrderStatus,
    #[serde(default)]
    pub stripe_payment_intent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |acc, item| acc.saturating_add(item.quantity))
    }
}

/// One line of an order, priced at the time of purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: OrderItemId,
    #[serde(default)]
    pub order_id: Option<OrderId>,
    pub product_id: ProductId,
    pub price: Price,
    pub quantity: u32,
    #[serde(default)]
    pub product: Option<Product>,
}

impl OrderItem {
    /// `price x quantity` for this line.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price * self.quantity
    }

    /// Product name when the API expanded it, otherwise the product id.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.product
            .as_ref()
            .map_or_else(|| self.product_id.to_string(), |p| p.name.clone())
    }
}

/// Payload for `POST /orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub items: Vec<OrderLineRequest>,
    pub customer_email: Email,
}

/// A `{productId, quantity}` pair inside [`CreateOrderRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Payload for `PUT /orders/{id}/status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOrderStatus {
    pub status: OrderStatus,
}

/// Response of `POST /orders/{id}/payment`.
///
/// The client secret is handed to the payment widget in the visitor's browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSession {
    pub client_secret: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_order_from_api_json() {
        let order: Order = serde_json::from_value(json!({
            "id": "ord_1",
            "customerEmail": "buyer@example.com",
            "totalAmount": 25.5,
            "status": "PENDING",
            "stripePaymentIntentId": null,
            "createdAt": "2025-03-01T12:30:00Z",
            "items": [
                { "id": "i1", "orderId": "ord_1", "productId": "a", "price": 10, "quantity": 2 },
                { "id": "i2", "orderId": "ord_1", "productId": "b", "price": 5.5, "quantity": 1,
                  "product": { "id": "b", "name": "Icon Set", "price": 5.5 } }
            ]
        }))
        .unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_amount, Price::from_cents(2550));
        assert_eq!(order.item_count(), 3);
        assert_eq!(order.items[0].line_total(), Price::from_cents(2000));
        assert_eq!(order.items[0].display_name(), "a");
        assert_eq!(order.items[1].display_name(), "Icon Set");
    }

    #[test]
    fn test_item_count_saturates() {
        let order: Order = serde_json::from_value(json!({
            "id": "ord_2",
            "customerEmail": "buyer@example.com",
            "totalAmount": 0,
            "status": "PAID",
            "createdAt": "2025-03-01T12:30:00Z",
            "items": [
                { "id": "i1", "productId": "a", "price": 1, "quantity": u32::MAX },
                { "id": "i2", "productId": "b", "price": 1, "quantity": u32::MAX }
            ]
        }))
        .unwrap();

        assert_eq!(order.item_count(), u32::MAX);
    }

    #[test]
    fn test_create_order_request_shape() {
        let request = CreateOrderRequest {
            items: vec![OrderLineRequest {
                product_id: ProductId::new("a"),
                quantity: 2,
            }],
            customer_email: Email::parse("buyer@example.com").unwrap(),
        };
        assert_eq!(
            serde_json::to_value(request).unwrap(),
            json!({
                "items": [{ "productId": "a", "quantity": 2 }],
                "customerEmail": "buyer@example.com"
            })
        );
    }
}
