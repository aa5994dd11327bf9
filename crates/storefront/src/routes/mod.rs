//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Catalog (?category=, ?q=)
//! GET  /health                 - Liveness
//! GET  /health/ready           - Readiness (commerce API reachable)
//!
//! # Cart (HTMX fragments, redirects without JS)
//! GET  /cart                   - Cart page
//! POST /cart/add               - Add one unit (returns count badge)
//! POST /cart/update            - Set quantity, 0 removes (returns cart_items fragment)
//! POST /cart/remove            - Remove entry (returns cart_items fragment)
//! POST /cart/clear             - Empty the cart (returns cart_items fragment)
//! GET  /cart/count             - Cart count badge (fragment)
//!
//! # Checkout
//! GET  /checkout               - Email form
//! POST /checkout               - Create order + payment session, show payment widget
//! GET  /checkout/success       - Return from the payment widget
//!
//! # Orders
//! GET  /orders                 - Order history lookup (?email=)
//!
//! # Admin console (login marker required except for /admin/login)
//! GET  /admin/login            - Login page
//! POST /admin/login            - Login action (rate limited)
//! POST /admin/logout           - Logout action
//! GET  /admin/products         - Product list + create form
//! POST /admin/products         - Create product
//! GET  /admin/categories       - Category list + create form
//! POST /admin/categories       - Create category
//! GET  /admin/orders           - Order list (?email=, ?status=)
//! POST /admin/orders/{id}/status - Change order status
//! ```

pub mod admin;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod health;
pub mod orders;

use axum::{
    Router,
    http::{HeaderMap, HeaderValue, Request, header},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use tower::Layer;
use tower_http::{services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer};

use crate::middleware::{
    SessionBackend, create_session_layer, csp_nonce_middleware, request_id_middleware,
    security_headers_middleware,
};
use crate::state::AppState;

/// Directory served under `/static`.
const STATIC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/static");

/// Whether the request was issued by HTMX.
pub(crate) fn is_htmx(headers: &HeaderMap) -> bool {
    headers
        .get("hx-request")
        .is_some_and(|v| v.as_bytes() == b"true")
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route("/count", get(cart::count))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::show).post(checkout::start))
        .route("/success", get(checkout::success))
}

/// Create all routes for the storefront.
pub fn routes(trust_proxy_headers: bool) -> Router<AppState> {
    Router::new()
        .route("/", get(catalog::index))
        .route("/orders", get(orders::index))
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .nest("/admin", admin::routes(trust_proxy_headers))
}

/// Build the complete application: routes, static files and middleware.
///
/// Serve it with `into_make_service_with_connect_info::<SocketAddr>()` so the
/// login rate limiter can key on the peer address.
pub fn app(state: AppState, sessions: SessionBackend) -> Router {
    let static_files = SetResponseHeaderLayer::overriding(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=3600"),
    )
    .layer(ServeDir::new(STATIC_DIR));

    let router =
        routes(state.config().trust_proxy_headers).nest_service("/static", static_files);

    let router = match sessions {
        SessionBackend::Postgres(store) => {
            router.layer(create_session_layer(store, state.config()))
        }
        SessionBackend::Memory(store) => router.layer(create_session_layer(store, state.config())),
    };

    router
        .layer(from_fn(csp_nonce_middleware))
        .layer(from_fn_with_state(
            state.clone(),
            security_headers_middleware,
        ))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_htmx() {
        let mut headers = HeaderMap::new();
        assert!(!is_htmx(&headers));

        headers.insert("hx-request", HeaderValue::from_static("true"));
        assert!(is_htmx(&headers));
    }
}
