//! Customer order history lookup.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Query, State};
use serde::Deserialize;
use tracing::instrument;

use digistore_core::{Email, Order, OrderItem};

use crate::filters;
use crate::middleware::CspNonce;
use crate::services::{CartStore, SessionCartStorage};
use crate::state::AppState;

/// Order line display data.
#[derive(Clone)]
pub struct OrderItemView {
    pub name: String,
    pub quantity: u32,
    pub price: String,
    pub line_price: String,
}

impl From<&OrderItem> for OrderItemView {
    fn from(item: &OrderItem) -> Self {
        Self {
            name: item.display_name(),
            quantity: item.quantity,
            price: item.price.display(),
            line_price: item.line_total().display(),
        }
    }
}

/// Order display data, shared with the admin console.
#[derive(Clone)]
pub struct OrderView {
    pub id: String,
    pub email: String,
    pub placed_on: String,
    pub status: String,
    pub status_class: String,
    pub total: String,
    pub item_count: u32,
    pub items: Vec<OrderItemView>,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.to_string(),
            email: order.customer_email.to_string(),
            placed_on: order.created_at.format("%b %-d, %Y").to_string(),
            status: order.status.to_string(),
            status_class: format!("status--{}", order.status.as_str().to_lowercase()),
            total: order.total_amount.display(),
            item_count: order.item_count(),
            items: order.items.iter().map(OrderItemView::from).collect(),
        }
    }
}

impl OrderView {
    /// Whether the order currently has this wire status.
    #[must_use]
    pub fn is_status(&self, status: &str) -> bool {
        self.status == status
    }
}

/// Lookup query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct OrdersQuery {
    pub email: Option<String>,
}

/// Order history template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/index.html")]
pub struct OrdersTemplate {
    pub email: String,
    pub searched: bool,
    pub orders: Vec<OrderView>,
    pub message: Option<String>,
    pub error: Option<String>,
    pub cart_count: u32,
    pub nonce: String,
}

/// Show the lookup form and, once an email is given, that customer's orders.
#[instrument(skip(state, store, nonce))]
pub async fn index(
    State(state): State<AppState>,
    store: CartStore<SessionCartStorage>,
    CspNonce(nonce): CspNonce,
    Query(query): Query<OrdersQuery>,
) -> OrdersTemplate {
    let raw = query.email.unwrap_or_default().trim().to_string();
    let mut page = OrdersTemplate {
        email: raw.clone(),
        searched: false,
        orders: Vec::new(),
        message: None,
        error: None,
        cart_count: store.total_items(),
        nonce,
    };

    // Blank email: show the prompt without calling the API
    if raw.is_empty() {
        return page;
    }

    let email = match Email::parse(&raw) {
        Ok(email) => email,
        Err(e) => {
            page.error = Some(format!("Please enter a valid email address ({e})"));
            return page;
        }
    };

    page.searched = true;
    match state.api().order_history(&email).await {
        Ok(response) => {
            page.orders = response.data.iter().map(OrderView::from).collect();
            page.message = response.message;
        }
        Err(e) => {
            tracing::warn!(error = %e, "Order history lookup failed");
            page.error = Some(e.user_message("Failed to fetch orders"));
        }
    }

    page
}
