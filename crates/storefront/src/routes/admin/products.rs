//! Admin product management.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::Redirect,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use digistore_core::{NewProduct, Price};

use super::{set_flash, take_flash};
use crate::filters;
use crate::middleware::{CspNonce, RequireAdmin};
use crate::models::Flash;
use crate::routes::catalog::ProductView;
use crate::state::AppState;

/// Category choice in the create form.
#[derive(Clone)]
pub struct CategoryOption {
    pub id: String,
    pub name: String,
}

/// New product form data.
#[derive(Debug, Deserialize)]
pub struct ProductForm {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub category_id: String,
}

impl ProductForm {
    /// Validate the form into an API payload.
    fn into_payload(self) -> std::result::Result<NewProduct, String> {
        if self.name.trim().is_empty() {
            return Err("Product name is required".to_string());
        }
        let price = Price::parse(&self.price).map_err(|e| format!("Invalid price: {e}"))?;

        Ok(NewProduct::new(
            &self.name,
            Some(&self.description),
            price,
            Some(&self.image_url),
            Some(&self.category_id),
        ))
    }
}

/// Product management template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/products.html")]
pub struct ProductsTemplate {
    pub admin_email: String,
    pub products: Vec<ProductView>,
    pub categories: Vec<CategoryOption>,
    pub flash: Option<Flash>,
    pub error: Option<String>,
    pub nonce: String,
}

/// List products with the create form.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    session: Session,
    CspNonce(nonce): CspNonce,
) -> ProductsTemplate {
    let mut error = None;

    let categories = state.api().list_categories().await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load categories");
        error = Some(e.user_message("Failed to load categories"));
        Vec::new()
    });
    let products = match state.api().list_products(None).await {
        Ok(products) => products,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load products");
            error = Some(e.user_message("Failed to load products"));
            Vec::new()
        }
    };

    ProductsTemplate {
        admin_email: admin.email.to_string(),
        products: products
            .iter()
            .map(|p| ProductView::new(p, &categories))
            .collect(),
        categories: categories
            .iter()
            .map(|c| CategoryOption {
                id: c.id.to_string(),
                name: c.name.clone(),
            })
            .collect(),
        flash: take_flash(&session).await,
        error,
        nonce,
    }
}

/// Create a product and report the outcome.
#[instrument(skip(state, session, _admin))]
pub async fn create(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    session: Session,
    Form(form): Form<ProductForm>,
) -> Redirect {
    let flash = match form.into_payload() {
        Err(message) => Flash::error(message),
        Ok(payload) => match state.api().create_product(&payload).await {
            Ok(response) => {
                tracing::info!(product_id = %response.data.id, "Product created");
                Flash::success(
                    response
                        .message
                        .unwrap_or_else(|| format!("Product \"{}\" created", response.data.name)),
                )
            }
            Err(e) => {
                tracing::warn!(error = %e, "Product creation failed");
                Flash::error(e.user_message("Failed to create product"))
            }
        },
    };

    set_flash(&session, flash).await;
    Redirect::to("/admin/products")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(name: &str, price: &str) -> ProductForm {
        ProductForm {
            name: name.to_string(),
            description: "  ".to_string(),
            price: price.to_string(),
            image_url: String::new(),
            category_id: "c1".to_string(),
        }
    }

    #[test]
    fn test_valid_form_builds_payload() {
        let payload = form("Icon Set", "12.50").into_payload();
        let payload = payload.ok();
        assert_eq!(payload.as_ref().map(|p| p.name.as_str()), Some("Icon Set"));
        assert_eq!(payload.as_ref().and_then(|p| p.description.clone()), None);
        assert_eq!(
            payload.and_then(|p| p.category_id).map(|c| c.to_string()),
            Some("c1".to_string())
        );
    }

    #[test]
    fn test_invalid_form_is_rejected() {
        assert_eq!(
            form("  ", "1.00").into_payload().err().as_deref(),
            Some("Product name is required")
        );
        assert!(form("Icon Set", "-1").into_payload().is_err());
        assert!(form("Icon Set", "abc").into_payload().is_err());
    }
}
