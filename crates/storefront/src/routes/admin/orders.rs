//! Admin order list and status changes.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::Redirect,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use digistore_core::{OrderId, OrderStatus};

use super::{set_flash, take_flash};
use crate::api::OrderFilter;
use crate::filters;
use crate::middleware::{CspNonce, RequireAdmin};
use crate::models::Flash;
use crate::routes::orders::OrderView;
use crate::state::AppState;

/// Order list query parameters. Blank values mean "no filter".
#[derive(Debug, Default, Deserialize)]
pub struct OrderListQuery {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub status: String,
}

impl OrderListQuery {
    fn filter(&self) -> OrderFilter {
        let email = self.email.trim();
        OrderFilter {
            email: (!email.is_empty()).then(|| email.to_string()),
            status: self.status.parse().ok(),
        }
    }
}

/// Status change form data.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
}

/// Status choice for filter and update selects.
#[derive(Clone)]
pub struct StatusOption {
    pub value: &'static str,
    pub selected: bool,
}

fn status_options(current: Option<OrderStatus>) -> Vec<StatusOption> {
    OrderStatus::ALL
        .iter()
        .map(|status| StatusOption {
            value: status.as_str(),
            selected: current == Some(*status),
        })
        .collect()
}

/// Order management template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/orders.html")]
pub struct OrdersTemplate {
    pub admin_email: String,
    pub orders: Vec<OrderView>,
    pub email_filter: String,
    pub status_filter: Vec<StatusOption>,
    pub statuses: Vec<&'static str>,
    pub flash: Option<Flash>,
    pub error: Option<String>,
    pub nonce: String,
}

/// List orders, optionally filtered by customer email and status.
#[instrument(skip(state, admin, session, nonce))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    session: Session,
    CspNonce(nonce): CspNonce,
    Query(query): Query<OrderListQuery>,
) -> OrdersTemplate {
    let filter = query.filter();

    let (orders, error) = match state.api().list_orders(&filter).await {
        Ok(orders) => (orders.iter().map(OrderView::from).collect(), None),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load orders");
            (Vec::new(), Some(e.user_message("Failed to fetch orders")))
        }
    };

    OrdersTemplate {
        admin_email: admin.email.to_string(),
        orders,
        email_filter: filter.email.unwrap_or_default(),
        status_filter: status_options(filter.status),
        statuses: OrderStatus::ALL.iter().map(OrderStatus::as_str).collect(),
        flash: take_flash(&session).await,
        error,
        nonce,
    }
}

/// Ask the API to move an order to another status.
///
/// Transitions are decided by the API; a rejection is reported as-is.
#[instrument(skip(state, _admin, session))]
pub async fn update_status(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    session: Session,
    Path(id): Path<String>,
    Form(form): Form<StatusForm>,
) -> Redirect {
    let order_id = OrderId::from(id);

    let flash = match form.status.parse::<OrderStatus>() {
        Err(e) => Flash::error(e),
        Ok(status) => match state.api().update_order_status(&order_id, status).await {
            Ok(response) => {
                tracing::info!(%order_id, %status, "Order status updated");
                Flash::success(
                    response
                        .message
                        .unwrap_or_else(|| format!("Order {order_id} marked {status}")),
                )
            }
            Err(e) => {
                tracing::warn!(error = %e, %order_id, "Order status update failed");
                Flash::error(e.user_message("Failed to update order status"))
            }
        },
    };

    set_flash(&session, flash).await;
    Redirect::to("/admin/orders")
}
