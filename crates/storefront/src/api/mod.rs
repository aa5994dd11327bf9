//! Commerce REST API client.
//!
//! # Architecture
//!
//! - The REST API is the source of truth for products, categories and orders
//! - JSON over `reqwest`, bodies accepted bare or in a `{data}` envelope
//! - Product and category lists cached in memory via `moka`
//! - One attempt per call: failures are reported, never retried
//!
//! # Endpoints
//!
//! ```text
//! GET  /products[?categoryId=]      list_products
//! GET  /categories                  list_categories
//! POST /products                    create_product     (admin)
//! POST /categories                  create_category    (admin)
//! GET  /orders[?email=][&status=]   list_orders        (admin)
//! GET  /orders/history?email=       order_history
//! PUT  /orders/{id}/status          update_order_status (admin)
//! POST /orders                      create_order
//! POST /orders/{id}/payment         create_payment
//! ```

mod cache;
pub mod envelope;

use std::sync::Arc;

use moka::future::Cache;
use reqwest::{Method, StatusCode};
use secrecy::SecretString;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use digistore_core::{
    Category, CategoryId, CreateOrderRequest, Email, NewCategory, NewProduct, Order, OrderId,
    OrderStatus, PaymentSession, Product, ProductId, UpdateOrderStatus,
};

use crate::config::{ApiConfig, bearer};
use cache::{CacheKey, CacheValue};

/// Errors that can occur when talking to the commerce API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (connection refused, timeout, ...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("API returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: StatusCode,
        /// Message from the body, or a per-operation fallback.
        message: String,
    },

    /// The body could not be parsed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A URL could not be built from the configured base.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl ApiError {
    /// Message suitable for showing to the visitor.
    ///
    /// API-provided messages are passed through; transport and parse
    /// failures collapse to `fallback`.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Status { message, .. } => message.clone(),
            Self::NotFound(what) => format!("{what} was not found"),
            _ => fallback.to_string(),
        }
    }
}

/// Filters for the admin order list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub email: Option<String>,
    pub status: Option<OrderStatus>,
}

/// A successful response payload plus the server's optional message.
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub data: T,
    pub message: Option<String>,
}

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the commerce REST API.
///
/// Cheaply cloneable; product and category lists are cached for the
/// configured TTL and invalidated by admin creations.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    token: Option<SecretString>,
    cache: Cache<CacheKey, CacheValue>,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let cache = Cache::builder()
            .max_capacity(256)
            .time_to_live(config.cache_ttl)
            .build();

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("digistore-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.base_url.clone(),
                token: config.token.clone(),
                cache,
            }),
        })
    }

    /// Resolve a path relative to the API base URL.
    fn url(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.inner.base_url.join(path)?)
    }

    /// Build a URL from path segments, percent-encoding each one.
    fn segments_url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        append_segments(&self.inner.base_url, segments)
    }

    /// Send a request and decode the (possibly enveloped) JSON response.
    async fn send<T, B>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
        authorized: bool,
        fallback: &str,
    ) -> Result<ApiResponse<T>, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let mut request = self.inner.client.request(method.clone(), url.clone());
        if let Some(body) = body {
            request = request.json(body);
        }
        if authorized && let Some(token) = &self.inner.token {
            request = request.header(reqwest::header::AUTHORIZATION, bearer(token));
        }

        let response = request.send().await?;
        let status = response.status();

        // Get response body as text first for better error diagnostics
        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!(
                %method,
                url = %url,
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "API returned non-success status"
            );
            let message =
                envelope::error_message(&body).unwrap_or_else(|| fallback.to_string());
            return Err(ApiError::Status { status, message });
        }

        match envelope::parse::<T>(&body) {
            Ok((data, message)) => Ok(ApiResponse { data, message }),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    url = %url,
                    body = %body.chars().take(500).collect::<String>(),
                    "Failed to parse API response"
                );
                Err(ApiError::Parse(e))
            }
        }
    }

    async fn get<T: DeserializeOwned>(&self, url: Url, fallback: &str) -> Result<T, ApiError> {
        self.send::<T, ()>(Method::GET, url, None, false, fallback)
            .await
            .map(|r| r.data)
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// List products, optionally restricted to a category.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        category: Option<&CategoryId>,
    ) -> Result<Vec<Product>, ApiError> {
        let key = CacheKey::Products {
            category: category.cloned(),
        };
        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let mut url = self.url("products")?;
        if let Some(category) = category {
            url.query_pairs_mut()
                .append_pair("categoryId", category.as_str());
        }

        let products: Vec<Product> = self.get(url, "Failed to load products").await?;
        self.inner
            .cache
            .insert(key, CacheValue::Products(products.clone()))
            .await;
        Ok(products)
    }

    /// Find a single product in the (cached) catalog.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if no product has this id.
    #[instrument(skip(self))]
    pub async fn find_product(&self, id: &ProductId) -> Result<Product, ApiError> {
        self.list_products(None)
            .await?
            .into_iter()
            .find(|p| &p.id == id)
            .ok_or_else(|| ApiError::NotFound(format!("Product {id}")))
    }

    /// List all categories.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        if let Some(CacheValue::Categories(categories)) =
            self.inner.cache.get(&CacheKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let url = self.url("categories")?;
        let categories: Vec<Category> = self.get(url, "Failed to load categories").await?;
        self.inner
            .cache
            .insert(
                CacheKey::Categories,
                CacheValue::Categories(categories.clone()),
            )
            .await;
        Ok(categories)
    }

    /// Create a product (admin).
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or the API rejects the payload.
    #[instrument(skip(self), fields(name = %product.name))]
    pub async fn create_product(
        &self,
        product: &NewProduct,
    ) -> Result<ApiResponse<Product>, ApiError> {
        let url = self.url("products")?;
        let response = self
            .send(Method::POST, url, Some(product), true, "Failed to create product")
            .await?;
        self.invalidate_catalog();
        Ok(response)
    }

    /// Create a category (admin).
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or the API rejects the payload.
    #[instrument(skip(self), fields(name = %category.name))]
    pub async fn create_category(
        &self,
        category: &NewCategory,
    ) -> Result<ApiResponse<Category>, ApiError> {
        let url = self.url("categories")?;
        let response = self
            .send(Method::POST, url, Some(category), true, "Failed to create category")
            .await?;
        self.invalidate_catalog();
        Ok(response)
    }

    /// Check that the API answers, bypassing the cache.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if `GET /categories` fails.
    pub async fn ping(&self) -> Result<(), ApiError> {
        let url = self.url("categories")?;
        self.get::<serde_json::Value>(url, "API unavailable")
            .await
            .map(|_| ())
    }

    /// Drop all cached catalog lists.
    pub fn invalidate_catalog(&self) {
        self.inner.cache.invalidate_all();
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// List orders for the admin console.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, ApiError> {
        let mut url = self.url("orders")?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(email) = filter.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
                query.append_pair("email", email);
            }
            if let Some(status) = filter.status {
                query.append_pair("status", status.as_str());
            }
        }
        // Drop a dangling `?` when no filter was applied
        if url.query() == Some("") {
            url.set_query(None);
        }

        self.send::<Vec<Order>, ()>(Method::GET, url, None, true, "Failed to fetch orders")
            .await
            .map(|r| r.data)
    }

    /// Look up a customer's order history.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn order_history(&self, email: &Email) -> Result<ApiResponse<Vec<Order>>, ApiError> {
        let mut url = self.url("orders/history")?;
        url.query_pairs_mut().append_pair("email", email.as_str());
        self.send::<Vec<Order>, ()>(Method::GET, url, None, false, "Failed to fetch orders")
            .await
    }

    /// Ask the API to move an order to a new status (admin).
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or the transition is rejected.
    #[instrument(skip(self))]
    pub async fn update_order_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
    ) -> Result<ApiResponse<serde_json::Value>, ApiError> {
        let url = self.segments_url(&["orders", id.as_str(), "status"])?;
        self.send(
            Method::PUT,
            url,
            Some(&UpdateOrderStatus { status }),
            true,
            "Failed to update order status",
        )
        .await
    }

    /// Create a pending order from cart contents.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or the API rejects the order.
    #[instrument(skip(self, request), fields(lines = request.items.len()))]
    pub async fn create_order(&self, request: &CreateOrderRequest) -> Result<Order, ApiError> {
        let url = self.url("orders")?;
        self.send(Method::POST, url, Some(request), false, "Failed to create order")
            .await
            .map(|r| r.data)
    }

    /// Obtain a payment-session handle for an order.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn create_payment(&self, order_id: &OrderId) -> Result<PaymentSession, ApiError> {
        let url = self.segments_url(&["orders", order_id.as_str(), "payment"])?;
        self.send::<PaymentSession, ()>(
            Method::POST,
            url,
            None,
            false,
            "Failed to create payment intent",
        )
        .await
        .map(|r| r.data)
    }
}

/// Append segments to the base URL's path. Reserved characters in a segment
/// such as `/` or `?` are encoded rather than interpreted.
fn append_segments(base: &Url, segments: &[&str]) -> Result<Url, ApiError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| ApiError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
