//! Catalog models: products and categories.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{CategoryId, ProductId};
use super::price::Price;

/// A purchasable digital product.
///
/// The cart keeps a copy of this struct taken when the product was added, so
/// later catalog edits do not change what is already in a visitor's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Price,
    #[serde(default)]
    pub image_url: Option<String>,
    /// Units available. Informational only; the storefront does not enforce it.
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Case-insensitive match of `query` against the name and description.
    ///
    /// A blank query matches everything.
    #[must_use]
    pub fn matches_search(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(&query)
            || self
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&query))
    }
}

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Category {
    /// The slug the backend derives when none is supplied: lower-cased words
    /// joined by `-`.
    ///
    /// ```
    /// use digistore_core::Category;
    ///
    /// assert_eq!(Category::slug_for("Design  Templates"), "design-templates");
    /// ```
    #[must_use]
    pub fn slug_for(name: &str) -> String {
        name.split_whitespace()
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join("-")
    }
}

/// Payload for `POST /products`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Sent as a JSON number.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
}

impl NewProduct {
    /// Build a creation payload; blank optional fields are omitted.
    #[must_use]
    pub fn new(
        name: &str,
        description: Option<&str>,
        price: Price,
        image_url: Option<&str>,
        category_id: Option<&str>,
    ) -> Self {
        Self {
            name: name.trim().to_owned(),
            description: non_blank(description),
            price: price.amount(),
            image_url: non_blank(image_url),
            category_id: non_blank(category_id).map(CategoryId::from),
        }
    }
}

/// Payload for `POST /categories`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
    /// Omitted when blank so the backend derives one from the name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

impl NewCategory {
    /// Build a creation payload, trimming the slug and dropping it when blank.
    #[must_use]
    pub fn new(name: &str, slug: Option<&str>) -> Self {
        Self {
            name: name.trim().to_owned(),
            slug: non_blank(slug),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_product_from_api_json() {
        let product: Product = serde_json::from_value(json!({
            "id": "1",
            "name": "Premium Digital Course",
            "description": null,
            "price": 99.99,
            "imageUrl": "https://images.example.com/course.png",
            "stock": 100,
            "categoryId": "1",
            "createdAt": "2025-01-15T10:00:00.000Z",
            "category": { "id": "1", "name": "Courses" }
        }))
        .unwrap();

        assert_eq!(product.id, ProductId::new("1"));
        assert_eq!(product.price, Price::from_cents(9999));
        assert_eq!(product.description, None);
        assert_eq!(product.category_id, Some(CategoryId::new("1")));
        assert!(product.created_at.is_some());
    }

    #[test]
    fn test_product_search() {
        let product: Product = serde_json::from_value(json!({
            "id": "2",
            "name": "Design Template Pack",
            "description": "Professional templates for your projects",
            "price": 49.99
        }))
        .unwrap();

        assert!(product.matches_search("template"));
        assert!(product.matches_search("PROFESSIONAL"));
        assert!(product.matches_search("  "));
        assert!(!product.matches_search("license"));
    }

    #[test]
    fn test_new_category_drops_blank_slug() {
        let payload = serde_json::to_value(NewCategory::new(" Software ", Some("   "))).unwrap();
        assert_eq!(payload, json!({ "name": "Software" }));

        let payload = serde_json::to_value(NewCategory::new("Software", Some(" apps "))).unwrap();
        assert_eq!(payload, json!({ "name": "Software", "slug": "apps" }));
    }

    #[test]
    fn test_new_product_sends_price_as_number() {
        let payload = NewProduct::new("Course", Some(""), Price::from_cents(1999), None, Some("3"));
        let value = serde_json::to_value(payload).unwrap();
        assert_eq!(
            value,
            json!({ "name": "Course", "price": 19.99, "categoryId": "3" })
        );
    }

    #[test]
    fn test_slug_for() {
        assert_eq!(Category::slug_for("Online Courses"), "online-courses");
        assert_eq!(Category::slug_for("  Mixed   CASE words "), "mixed-case-words");
    }
}
