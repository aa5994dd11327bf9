//! Catalog page.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Query, State};
use serde::Deserialize;
use tracing::instrument;

use digistore_core::{Category, CategoryId, Product};

use crate::filters;
use crate::middleware::CspNonce;
use crate::services::{CartStore, SessionCartStorage};
use crate::state::AppState;

/// Product display data for templates.
#[derive(Clone)]
pub struct ProductView {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub price: String,
    pub image_url: Option<String>,
    pub in_stock: bool,
    pub category: Option<String>,
}

impl ProductView {
    pub(crate) fn new(product: &Product, categories: &[Category]) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price.display(),
            image_url: product.image_url.clone(),
            in_stock: product.stock > 0,
            category: product.category_id.as_ref().and_then(|id| {
                categories
                    .iter()
                    .find(|c| &c.id == id)
                    .map(|c| c.name.clone())
            }),
        }
    }
}

/// Category filter link.
#[derive(Clone)]
pub struct CategoryLink {
    pub id: String,
    pub name: String,
    pub active: bool,
}

/// Catalog query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogQuery {
    pub category: Option<String>,
    pub q: Option<String>,
}

/// Catalog page template.
#[derive(Template, WebTemplate)]
#[template(path = "catalog/index.html")]
pub struct CatalogTemplate {
    pub products: Vec<ProductView>,
    pub categories: Vec<CategoryLink>,
    pub selected_category: Option<String>,
    pub query: String,
    pub error: Option<String>,
    pub cart_count: u32,
    pub nonce: String,
}

/// Display the catalog.
///
/// API failures are shown on the page rather than turned into an error
/// response, so the rest of the site stays usable.
#[instrument(skip(state, store, nonce))]
pub async fn index(
    State(state): State<AppState>,
    store: CartStore<SessionCartStorage>,
    CspNonce(nonce): CspNonce,
    Query(query): Query<CatalogQuery>,
) -> CatalogTemplate {
    let selected = query
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(CategoryId::from);
    let search = query.q.as_deref().map(str::trim).unwrap_or_default();

    let mut error = None;

    let categories = state.api().list_categories().await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load categories");
        error = Some(e.user_message("Failed to load categories"));
        Vec::new()
    });

    let products = match state.api().list_products(selected.as_ref()).await {
        Ok(products) => products,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load products");
            error = Some(e.user_message("Failed to load products"));
            Vec::new()
        }
    };

    let products = products
        .iter()
        .filter(|p| p.matches_search(search))
        .map(|p| ProductView::new(p, &categories))
        .collect();

    let categories = categories
        .iter()
        .map(|c| CategoryLink {
            id: c.id.to_string(),
            name: c.name.clone(),
            active: selected.as_ref() == Some(&c.id),
        })
        .collect();

    CatalogTemplate {
        products,
        categories,
        selected_category: selected.map(|id| id.to_string()),
        query: search.to_string(),
        error,
        cart_count: store.total_items(),
        nonce,
    }
}

#[cfg(test)]
mod tests {
    use digistore_core::{Price, ProductId};

    use super::*;

    #[test]
    fn test_product_view_resolves_category_name() {
        let categories = vec![Category {
            id: CategoryId::new("c1"),
            name: "E-books".to_string(),
            slug: "e-books".to_string(),
            created_at: None,
            updated_at: None,
        }];
        let product = Product {
            id: ProductId::new("p1"),
            name: "Rust Guide".to_string(),
            description: None,
            price: Price::from_cents(2500),
            image_url: None,
            stock: 0,
            category_id: Some(CategoryId::new("c1")),
            created_at: None,
        };

        let view = ProductView::new(&product, &categories);
        assert_eq!(view.price, "$25.00");
        assert_eq!(view.category.as_deref(), Some("E-books"));
        assert!(!view.in_stock);
    }
}
