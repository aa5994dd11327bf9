//! Admin console.
//!
//! Every page except the login form requires the session login marker
//! ([`RequireAdmin`](crate::middleware::RequireAdmin)). Results of actions
//! are reported through a one-shot flash message stored in the session.

pub mod auth;
pub mod categories;
pub mod orders;
pub mod products;

use axum::{
    Router,
    response::Redirect,
    routing::{get, post},
};
use tower_sessions::Session;

use crate::middleware::{RequireAdmin, admin_login_rate_limiter};
use crate::models::{Flash, session_keys};
use crate::state::AppState;

/// Create the admin routes router.
///
/// `trust_proxy_headers` selects how the login rate limiter identifies clients.
pub fn routes(trust_proxy_headers: bool) -> Router<AppState> {
    let login_limiter = admin_login_rate_limiter(trust_proxy_headers);
    Router::new()
        .route("/", get(index))
        .route(
            "/login",
            get(auth::login_page).merge(post(auth::login).layer(login_limiter)),
        )
        .route("/logout", post(auth::logout))
        .route("/products", get(products::index).post(products::create))
        .route("/categories", get(categories::index).post(categories::create))
        .route("/orders", get(orders::index))
        .route("/orders/{id}/status", post(orders::update_status))
}

/// `/admin` lands on the product list.
async fn index(_admin: RequireAdmin) -> Redirect {
    Redirect::to("/admin/products")
}

/// Queue a flash message for the next page.
async fn set_flash(session: &Session, flash: Flash) {
    if let Err(e) = session.insert(session_keys::FLASH, flash).await {
        tracing::error!(error = %e, "Failed to store flash message");
    }
}

/// Take (and clear) the pending flash message.
async fn take_flash(session: &Session) -> Option<Flash> {
    session
        .remove::<Flash>(session_keys::FLASH)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to read flash message");
            None
        })
}
