//! Checkout orchestration.
//!
//! 1. Collect the customer's email
//! 2. Create a pending order from the cart
//! 3. Request a payment-session handle for that order
//! 4. Hand the client secret to the payment widget in the browser
//! 5. On reported success, clear the Cart Store
//!
//! A failure at step 2 or 3 aborts before payment and leaves the cart alone.

use thiserror::Error;
use tracing::instrument;

use digistore_core::{Cart, Email, EmailError, Order, OrderId};

use crate::api::{ApiClient, ApiError};
use crate::services::cart::{CartStorage, CartStorageError, CartStore};

/// Errors that abort a checkout before payment.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Nothing to buy.
    #[error("cart is empty")]
    EmptyCart,

    /// The customer email is not usable.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// The API refused or failed to create the order.
    #[error("order creation failed: {0}")]
    OrderCreation(#[source] ApiError),

    /// The order exists but no payment session could be obtained.
    #[error("payment initiation failed for order {order_id}: {source}")]
    PaymentInitiation {
        order_id: OrderId,
        #[source]
        source: ApiError,
    },
}

impl CheckoutError {
    /// Message shown on the checkout page.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyCart => "Your cart is empty".to_string(),
            Self::InvalidEmail(_) => "Please enter a valid email address".to_string(),
            Self::OrderCreation(e) => e.user_message("Failed to create order"),
            Self::PaymentInitiation { source, .. } => {
                source.user_message("Failed to create payment intent")
            }
        }
    }
}

/// What the payment page needs: the pending order and its client secret.
#[derive(Debug, Clone)]
pub struct PaymentHandoff {
    pub order: Order,
    pub client_secret: String,
}

/// Runs checkout steps 2 and 3 against the commerce API.
pub struct CheckoutService<'a> {
    api: &'a ApiClient,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(api: &'a ApiClient) -> Self {
        Self { api }
    }

    /// Create the pending order and obtain its payment handle.
    ///
    /// The cart is read, never modified.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart` or `CheckoutError::InvalidEmail`
    /// before any API call, or the step that failed.
    #[instrument(skip(self, cart), fields(items = cart.total_items()))]
    pub async fn start(&self, cart: &Cart, email: &str) -> Result<PaymentHandoff, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let email = Email::parse(email)?;

        let order = self
            .api
            .create_order(&cart.order_request(email))
            .await
            .map_err(CheckoutError::OrderCreation)?;

        tracing::info!(order_id = %order.id, total = %order.total_amount, "Order created");

        let payment = self
            .api
            .create_payment(&order.id)
            .await
            .map_err(|source| CheckoutError::PaymentInitiation {
                order_id: order.id.clone(),
                source,
            })?;

        Ok(PaymentHandoff {
            order,
            client_secret: payment.client_secret,
        })
    }

    /// Finish a checkout the payment widget reported as successful.
    ///
    /// # Errors
    ///
    /// Returns `CartStorageError` if the cart cannot be cleared.
    pub async fn complete<S: CartStorage>(
        store: &mut CartStore<S>,
    ) -> Result<(), CartStorageError> {
        store.clear_cart().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use reqwest::StatusCode;
    use url::Url;

    use digistore_core::{Price, Product, ProductId};

    use super::*;
    use crate::config::ApiConfig;
    use crate::services::cart::MemoryCartStorage;

    fn offline_client() -> ApiClient {
        ApiClient::new(&ApiConfig {
            // Port 9 (discard) on localhost: any call that slips through fails fast
            base_url: Url::parse("http://127.0.0.1:9/api/").unwrap(),
            token: None,
            timeout: Duration::from_millis(200),
            cache_ttl: Duration::from_secs(60),
        })
        .unwrap()
    }

    fn product() -> Product {
        Product {
            id: ProductId::new("p1"),
            name: "E-book".to_string(),
            description: None,
            price: Price::from_cents(1999),
            image_url: None,
            stock: 1,
            category_id: None,
            created_at: None,
        }
    }

    #[tokio::test]
    async fn test_empty_cart_is_rejected() {
        let api = offline_client();
        let err = CheckoutService::new(&api)
            .start(&Cart::new(), "buyer@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::EmptyCart));
        assert_eq!(err.user_message(), "Your cart is empty");
    }

    #[tokio::test]
    async fn test_invalid_email_is_rejected() {
        let api = offline_client();
        let mut cart = Cart::new();
        cart.add(&product());

        let err = CheckoutService::new(&api)
            .start(&cart, "not-an-email")
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidEmail(_)));
    }

    #[tokio::test]
    async fn test_unreachable_api_aborts_at_order_creation() {
        let api = offline_client();
        let mut cart = Cart::new();
        cart.add(&product());

        let err = CheckoutService::new(&api)
            .start(&cart, "buyer@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::OrderCreation(_)));
        assert_eq!(err.user_message(), "Failed to create order");
        assert_eq!(cart.total_items(), 1);
    }

    #[test]
    fn test_payment_failure_message_passes_through() {
        let err = CheckoutError::PaymentInitiation {
            order_id: OrderId::new("o1"),
            source: ApiError::Status {
                status: StatusCode::BAD_GATEWAY,
                message: "Payment provider unavailable".to_string(),
            },
        };
        assert_eq!(err.user_message(), "Payment provider unavailable");
    }

    #[tokio::test]
    async fn test_complete_clears_cart() {
        let storage = MemoryCartStorage::new();
        let mut store = CartStore::open(storage.clone()).await.unwrap();
        store.add_to_cart(&product()).await.unwrap();

        CheckoutService::complete(&mut store).await.unwrap();

        assert_eq!(store.total_items(), 0);
        assert!(storage.snapshot().await.is_none());
    }
}
