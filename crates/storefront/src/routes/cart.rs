//! Cart route handlers.
//!
//! With HTMX (`HX-Request: true`) mutations answer with a fragment and an
//! `HX-Trigger: cart-updated` header so the navigation badge refreshes.
//! Plain form posts are redirected back to `/cart`.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::HeaderMap,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use digistore_core::{Cart, CartItem, ProductId, QuantityUpdate};

use super::is_htmx;
use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::middleware::CspNonce;
use crate::services::{CartStore, SessionCartStorage};
use crate::state::AppState;

/// Cart item display data for templates.
#[derive(Clone)]
pub struct CartItemView {
    pub product_id: String,
    pub name: String,
    pub image_url: Option<String>,
    pub quantity: u32,
    pub decrement: u32,
    pub increment: u32,
    pub price: String,
    pub line_price: String,
}

impl From<&CartItem> for CartItemView {
    fn from(item: &CartItem) -> Self {
        let quantity = item.quantity();
        Self {
            product_id: item.product.id.to_string(),
            name: item.product.name.clone(),
            image_url: item.product.image_url.clone(),
            quantity,
            decrement: quantity.saturating_sub(1),
            increment: quantity.saturating_add(1),
            price: item.product.price.display(),
            line_price: item.line_total().display(),
        }
    }
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub subtotal: String,
    pub item_count: u32,
}

impl CartView {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            items: cart.items().iter().map(CartItemView::from).collect(),
            subtotal: cart.subtotal().display(),
            item_count: cart.total_items(),
        }
    }
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: String,
}

/// Update cart form data.
///
/// Signed so that a negative value from a hand-edited form clamps to zero
/// instead of being rejected.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_id: String,
    pub quantity: i64,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: String,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub cart: CartView,
    pub cart_count: u32,
    pub nonce: String,
}

/// Cart items fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub cart_count: u32,
}

/// Clamp a submitted quantity into the store's range.
fn clamp_quantity(raw: i64) -> u32 {
    u32::try_from(raw.max(0)).unwrap_or(u32::MAX)
}

/// Respond to a cart mutation with the refreshed items fragment.
fn items_response(headers: &HeaderMap, store: &CartStore<SessionCartStorage>) -> Response {
    if !is_htmx(headers) {
        return Redirect::to("/cart").into_response();
    }

    (
        AppendHeaders([("HX-Trigger", "cart-updated")]),
        CartItemsTemplate {
            cart: CartView::from(store.cart()),
        },
    )
        .into_response()
}

/// Display cart page.
#[instrument(skip(store, nonce))]
pub async fn show(
    store: CartStore<SessionCartStorage>,
    CspNonce(nonce): CspNonce,
) -> CartShowTemplate {
    CartShowTemplate {
        cart: CartView::from(store.cart()),
        cart_count: store.total_items(),
        nonce,
    }
}

/// Add one unit of a product to the cart.
///
/// The product is looked up in the catalog so the cart stores a snapshot
/// taken now, not whatever the form claims.
#[instrument(skip(state, store, headers))]
pub async fn add(
    State(state): State<AppState>,
    mut store: CartStore<SessionCartStorage>,
    headers: HeaderMap,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let product_id = ProductId::from(form.product_id);
    let product = state.api().find_product(&product_id).await?;

    let quantity = store.add_to_cart(&product).await?;
    add_breadcrumb(
        "cart",
        "Added to cart",
        Some(&[("product_id", product_id.as_str())]),
    );
    tracing::debug!(%product_id, quantity, "Added to cart");

    if !is_htmx(&headers) {
        return Ok(Redirect::to("/cart").into_response());
    }

    Ok((
        AppendHeaders([("HX-Trigger", "cart-updated")]),
        CartCountTemplate {
            cart_count: store.total_items(),
        },
    )
        .into_response())
}

/// Set the quantity of a cart entry. Zero (or less) removes it.
#[instrument(skip(store, headers))]
pub async fn update(
    mut store: CartStore<SessionCartStorage>,
    headers: HeaderMap,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response> {
    let product_id = ProductId::from(form.product_id);
    let outcome = store
        .update_quantity(&product_id, clamp_quantity(form.quantity))
        .await?;

    if outcome == QuantityUpdate::NotInCart {
        tracing::debug!(%product_id, "Quantity update for product not in cart");
    }

    Ok(items_response(&headers, &store))
}

/// Remove an entry from the cart. Absent products are ignored.
#[instrument(skip(store, headers))]
pub async fn remove(
    mut store: CartStore<SessionCartStorage>,
    headers: HeaderMap,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Response> {
    store
        .remove_from_cart(&ProductId::from(form.product_id))
        .await?;

    Ok(items_response(&headers, &store))
}

/// Empty the cart.
#[instrument(skip(store, headers))]
pub async fn clear(
    mut store: CartStore<SessionCartStorage>,
    headers: HeaderMap,
) -> Result<Response> {
    store.clear_cart().await?;
    Ok(items_response(&headers, &store))
}

/// Get cart count badge (HTMX).
#[instrument(skip(store))]
pub async fn count(store: CartStore<SessionCartStorage>) -> CartCountTemplate {
    CartCountTemplate {
        cart_count: store.total_items(),
    }
}
