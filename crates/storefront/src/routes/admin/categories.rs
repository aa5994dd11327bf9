//! Admin category management.

use askama::Template;
use askama_web::WebTemplate;
use axum::{Form, extract::State, response::Redirect};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use digistore_core::{Category, NewCategory};

use super::{set_flash, take_flash};
use crate::filters;
use crate::middleware::{CspNonce, RequireAdmin};
use crate::models::Flash;
use crate::state::AppState;

/// Category display data.
#[derive(Clone)]
pub struct CategoryView {
    pub id: String,
    pub name: String,
    pub slug: String,
}

impl From<&Category> for CategoryView {
    fn from(category: &Category) -> Self {
        Self {
            id: category.id.to_string(),
            name: category.name.clone(),
            slug: if category.slug.is_empty() {
                Category::slug_for(&category.name)
            } else {
                category.slug.clone()
            },
        }
    }
}

/// New category form data.
#[derive(Debug, Deserialize)]
pub struct CategoryForm {
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

/// Category management template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/categories.html")]
pub struct CategoriesTemplate {
    pub admin_email: String,
    pub categories: Vec<CategoryView>,
    pub flash: Option<Flash>,
    pub error: Option<String>,
    pub nonce: String,
}

/// List categories with the create form.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    session: Session,
    CspNonce(nonce): CspNonce,
) -> CategoriesTemplate {
    let (categories, error) = match state.api().list_categories().await {
        Ok(categories) => (categories.iter().map(CategoryView::from).collect(), None),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load categories");
            (Vec::new(), Some(e.user_message("Failed to load categories")))
        }
    };

    CategoriesTemplate {
        admin_email: admin.email.to_string(),
        categories,
        flash: take_flash(&session).await,
        error,
        nonce,
    }
}

/// Create a category and report the outcome.
#[instrument(skip(state, session, _admin))]
pub async fn create(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    session: Session,
    Form(form): Form<CategoryForm>,
) -> Redirect {
    let flash = if form.name.trim().is_empty() {
        Flash::error("Category name is required")
    } else {
        let payload = NewCategory::new(&form.name, Some(&form.slug));
        match state.api().create_category(&payload).await {
            Ok(response) => {
                tracing::info!(category_id = %response.data.id, "Category created");
                Flash::success(
                    response
                        .message
                        .unwrap_or_else(|| format!("Category \"{}\" created", response.data.name)),
                )
            }
            Err(e) => {
                tracing::warn!(error = %e, "Category creation failed");
                Flash::error(e.user_message("Failed to create category"))
            }
        }
    };

    set_flash(&session, flash).await;
    Redirect::to("/admin/categories")
}
