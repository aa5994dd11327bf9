//! Checkout route handlers.
//!
//! The payment widget runs in the browser: the server creates the order,
//! obtains the client secret and renders the widget page. The widget
//! redirects back to `/checkout/success` with `redirect_status`.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use digistore_core::OrderId;

use super::cart::CartView;
use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::middleware::CspNonce;
use crate::models::session_keys;
use crate::services::{CartStore, CheckoutError, CheckoutService, SessionCartStorage};
use crate::state::AppState;

/// Message shown when no publishable key is configured.
const PAYMENT_NOT_CONFIGURED: &str = "Payment is not configured. Please try again later.";

/// Message shown when the widget reports anything but success.
const PAYMENT_NOT_COMPLETED: &str =
    "Payment was not completed. Your cart has been kept so you can try again.";

/// Checkout form data.
#[derive(Debug, Deserialize)]
pub struct CheckoutForm {
    pub email: String,
}

/// Query string the payment widget appends to the return URL.
#[derive(Debug, Default, Deserialize)]
pub struct PaymentReturn {
    pub redirect_status: Option<String>,
    pub payment_intent: Option<String>,
}

/// Checkout page template (email form).
#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutTemplate {
    pub cart: CartView,
    pub email: String,
    pub error: Option<String>,
    pub payment_configured: bool,
    pub cart_count: u32,
    pub nonce: String,
}

/// Payment page template (hosts the payment widget).
#[derive(Template, WebTemplate)]
#[template(path = "checkout/payment.html")]
pub struct PaymentTemplate {
    pub order_id: String,
    pub email: String,
    pub total: String,
    pub publishable_key: String,
    pub client_secret: String,
    pub return_url: String,
    pub cart_count: u32,
    pub nonce: String,
}

/// Order confirmation template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/success.html")]
pub struct SuccessTemplate {
    pub order_id: Option<String>,
    pub cart_count: u32,
    pub nonce: String,
}

fn checkout_page(
    state: &AppState,
    store: &CartStore<SessionCartStorage>,
    email: String,
    error: Option<String>,
    nonce: String,
) -> CheckoutTemplate {
    CheckoutTemplate {
        cart: CartView::from(store.cart()),
        email,
        error,
        payment_configured: state.config().payments.publishable_key.is_some(),
        cart_count: store.total_items(),
        nonce,
    }
}

/// Display the checkout form. An empty cart goes back to `/cart`.
#[instrument(skip(state, store, nonce))]
pub async fn show(
    State(state): State<AppState>,
    store: CartStore<SessionCartStorage>,
    CspNonce(nonce): CspNonce,
) -> Response {
    if store.cart().is_empty() {
        return Redirect::to("/cart").into_response();
    }

    let error = state
        .config()
        .payments
        .publishable_key
        .is_none()
        .then(|| PAYMENT_NOT_CONFIGURED.to_string());

    checkout_page(&state, &store, String::new(), error, nonce).into_response()
}

/// Create the order and payment session, then show the payment widget.
///
/// Any failure re-renders the form with the reason; the cart is untouched.
#[instrument(skip(state, store, session, nonce, form))]
pub async fn start(
    State(state): State<AppState>,
    store: CartStore<SessionCartStorage>,
    session: Session,
    CspNonce(nonce): CspNonce,
    Form(form): Form<CheckoutForm>,
) -> Result<Response> {
    if store.cart().is_empty() {
        return Ok(Redirect::to("/cart").into_response());
    }

    let Some(publishable_key) = state.config().payments.publishable_key.clone() else {
        let page = checkout_page(
            &state,
            &store,
            form.email,
            Some(PAYMENT_NOT_CONFIGURED.to_string()),
            nonce,
        );
        return Ok((StatusCode::SERVICE_UNAVAILABLE, page).into_response());
    };

    let handoff = match CheckoutService::new(state.api())
        .start(store.cart(), &form.email)
        .await
    {
        Ok(handoff) => handoff,
        Err(CheckoutError::EmptyCart) => return Ok(Redirect::to("/cart").into_response()),
        Err(e) => {
            tracing::warn!(error = %e, "Checkout aborted before payment");
            let status = match e {
                CheckoutError::InvalidEmail(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::BAD_GATEWAY,
            };
            let page = checkout_page(&state, &store, form.email, Some(e.user_message()), nonce);
            return Ok((status, page).into_response());
        }
    };

    session
        .insert(session_keys::CHECKOUT_ORDER_ID, &handoff.order.id)
        .await?;
    add_breadcrumb(
        "checkout",
        "Payment started",
        Some(&[("order_id", handoff.order.id.as_str())]),
    );

    Ok(PaymentTemplate {
        order_id: handoff.order.id.to_string(),
        email: handoff.order.customer_email.to_string(),
        total: handoff.order.total_amount.display(),
        publishable_key,
        client_secret: handoff.client_secret,
        return_url: format!(
            "{}/checkout/success",
            state.config().base_url.trim_end_matches('/')
        ),
        cart_count: store.total_items(),
        nonce,
    }
    .into_response())
}

/// Handle the payment widget's redirect.
///
/// Only `redirect_status=succeeded` clears the cart. Anything else leaves the
/// order pending and the cart intact so the visitor can retry.
#[instrument(skip(state, store, session, nonce))]
pub async fn success(
    State(state): State<AppState>,
    mut store: CartStore<SessionCartStorage>,
    session: Session,
    CspNonce(nonce): CspNonce,
    Query(params): Query<PaymentReturn>,
) -> Result<Response> {
    if params.redirect_status.as_deref() != Some("succeeded") {
        tracing::info!(
            redirect_status = params.redirect_status.as_deref().unwrap_or("missing"),
            "Payment not completed"
        );
        if store.cart().is_empty() {
            return Ok(Redirect::to("/cart").into_response());
        }
        let page = checkout_page(
            &state,
            &store,
            String::new(),
            Some(PAYMENT_NOT_COMPLETED.to_string()),
            nonce,
        );
        return Ok(page.into_response());
    }

    CheckoutService::complete(&mut store).await?;
    let order_id = session
        .remove::<OrderId>(session_keys::CHECKOUT_ORDER_ID)
        .await?;

    tracing::info!(
        order_id = order_id.as_ref().map_or("unknown", OrderId::as_str),
        payment_intent = params.payment_intent.as_deref().unwrap_or("unknown"),
        "Checkout completed"
    );

    Ok(SuccessTemplate {
        order_id: order_id.map(|id| id.to_string()),
        cart_count: store.total_items(),
        nonce,
    }
    .into_response())
}
