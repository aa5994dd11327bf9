//! Integration tests for Digistore.
//!
//! Each test boots a real storefront on an ephemeral port, pointed at an
//! in-process [`FakeBackend`] that plays the commerce REST API. Sessions use
//! the memory store, so no database is required.
//!
//! ```bash
//! cargo test -p digistore-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::missing_panics_doc)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use chrono::Utc;
use reqwest::redirect::Policy;
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::{Value, json};

use digistore_core::{
    Category, CategoryId, CreateOrderRequest, Email, NewCategory, NewProduct, Order, OrderId,
    OrderItem, OrderItemId, OrderStatus, Price, Product, ProductId, UpdateOrderStatus,
};
use digistore_storefront::config::{StorefrontConfig, parse_base_url};
use digistore_storefront::middleware::SessionBackend;
use digistore_storefront::services::auth::hash_password;
use digistore_storefront::state::AppState;

/// Admin console login used by every test context.
pub const ADMIN_EMAIL: &str = "owner@example.com";

/// Password matching [`ADMIN_EMAIL`].
pub const ADMIN_PASSWORD: &str = "correct horse battery staple";

/// Bearer token the storefront sends on admin calls.
pub const API_TOKEN: &str = "test-api-token-9f8e7d6c5b4a";

/// Publishable key rendered onto the payment page.
pub const PUBLISHABLE_KEY: &str = "pk_test_digistore";

// =============================================================================
// Fake commerce API
// =============================================================================

#[derive(Default)]
struct BackendData {
    products: Vec<Product>,
    categories: Vec<Category>,
    orders: Vec<Order>,
    product_list_calls: usize,
    history_calls: usize,
    fail_payments: bool,
    next_id: u64,
}

impl BackendData {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}_{}", self.next_id)
    }
}

/// In-memory stand-in for the commerce REST API.
///
/// Mirrors the wire format the storefront expects: camelCase JSON, payloads
/// in a `{data, message}` envelope (categories are returned bare), failures
/// as `{message}` or `{error}`.
#[derive(Clone, Default)]
pub struct FakeBackend {
    data: Arc<Mutex<BackendData>>,
}

impl FakeBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BackendData> {
        self.data.lock().expect("backend mutex poisoned")
    }

    /// Seed a category.
    pub fn add_category(&self, id: &str, name: &str) -> Category {
        let category = Category {
            id: CategoryId::new(id),
            name: name.to_string(),
            slug: Category::slug_for(name),
            created_at: Some(Utc::now()),
            updated_at: None,
        };
        self.lock().categories.push(category.clone());
        category
    }

    /// Seed a product.
    pub fn add_product(
        &self,
        id: &str,
        name: &str,
        cents: u32,
        stock: u32,
        category: Option<&str>,
    ) -> Product {
        let product = Product {
            id: ProductId::new(id),
            name: name.to_string(),
            description: Some(format!("{name} description")),
            price: Price::from_cents(cents),
            image_url: None,
            stock,
            category_id: category.map(CategoryId::new),
            created_at: Some(Utc::now()),
        };
        self.lock().products.push(product.clone());
        product
    }

    /// Make `POST /orders/{id}/payment` fail from now on.
    pub fn fail_payments(&self) {
        self.lock().fail_payments = true;
    }

    /// Orders placed so far.
    #[must_use]
    pub fn orders(&self) -> Vec<Order> {
        self.lock().orders.clone()
    }

    /// Products currently in the catalog.
    #[must_use]
    pub fn products(&self) -> Vec<Product> {
        self.lock().products.clone()
    }

    /// Categories currently in the catalog.
    #[must_use]
    pub fn categories(&self) -> Vec<Category> {
        self.lock().categories.clone()
    }

    /// How many times `GET /products` was served.
    #[must_use]
    pub fn product_list_calls(&self) -> usize {
        self.lock().product_list_calls
    }

    /// How many times `GET /orders/history` was served.
    #[must_use]
    pub fn history_calls(&self) -> usize {
        self.lock().history_calls
    }

    /// Router mounted under `/api`.
    pub fn router(&self) -> Router {
        let api = Router::new()
            .route("/products", get(list_products).post(create_product))
            .route("/categories", get(list_categories).post(create_category))
            .route("/orders", get(list_orders).post(create_order))
            .route("/orders/history", get(order_history))
            .route("/orders/{id}/status", put(update_status))
            .route("/orders/{id}/payment", post(create_payment))
            .with_state(self.clone());
        Router::new().nest("/api", api)
    }
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(format!("Bearer {API_TOKEN}").as_str())
}

#[derive(Deserialize)]
struct ProductQuery {
    #[serde(rename = "categoryId")]
    category_id: Option<String>,
}

async fn list_products(
    State(backend): State<FakeBackend>,
    Query(query): Query<ProductQuery>,
) -> Json<Value> {
    let mut data = backend.lock();
    data.product_list_calls += 1;
    let products: Vec<&Product> = data
        .products
        .iter()
        .filter(|p| {
            query
                .category_id
                .as_deref()
                .is_none_or(|c| p.category_id.as_ref().is_some_and(|id| id.as_str() == c))
        })
        .collect();
    Json(json!({ "data": products }))
}

async fn create_product(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Json(payload): Json<NewProduct>,
) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    let Ok(price) = Price::new(payload.price) else {
        return error(StatusCode::BAD_REQUEST, "Price must be positive");
    };

    let mut data = backend.lock();
    let product = Product {
        id: ProductId::from(data.next_id("prod")),
        name: payload.name,
        description: payload.description,
        price,
        image_url: payload.image_url,
        stock: 100,
        category_id: payload.category_id,
        created_at: Some(Utc::now()),
    };
    data.products.push(product.clone());
    (
        StatusCode::CREATED,
        Json(json!({ "data": product, "message": "Product created" })),
    )
        .into_response()
}

async fn list_categories(State(backend): State<FakeBackend>) -> Json<Value> {
    Json(json!(backend.lock().categories))
}

async fn create_category(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Json(payload): Json<NewCategory>,
) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }

    let mut data = backend.lock();
    let category = Category {
        id: CategoryId::from(data.next_id("cat")),
        slug: payload
            .slug
            .unwrap_or_else(|| Category::slug_for(&payload.name)),
        name: payload.name,
        created_at: Some(Utc::now()),
        updated_at: None,
    };
    data.categories.push(category.clone());
    (
        StatusCode::CREATED,
        Json(json!({ "data": category, "message": "Category created" })),
    )
        .into_response()
}

#[derive(Deserialize)]
struct OrdersQuery {
    email: Option<String>,
    status: Option<String>,
}

async fn list_orders(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Query(query): Query<OrdersQuery>,
) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    let data = backend.lock();
    let orders: Vec<&Order> = data
        .orders
        .iter()
        .filter(|o| {
            query
                .email
                .as_deref()
                .is_none_or(|e| {
                    o.customer_email
                        .as_str()
                        .to_lowercase()
                        .contains(&e.to_lowercase())
                })
        })
        .filter(|o| query.status.as_deref().is_none_or(|s| o.status.as_str() == s))
        .collect();
    Json(json!({ "data": orders })).into_response()
}

async fn order_history(
    State(backend): State<FakeBackend>,
    Query(query): Query<OrdersQuery>,
) -> Response {
    let Some(email) = query.email.as_deref().and_then(|e| Email::parse(e).ok()) else {
        return error(StatusCode::BAD_REQUEST, "A valid email is required");
    };

    let mut data = backend.lock();
    data.history_calls += 1;
    let orders: Vec<Order> = data
        .orders
        .iter()
        .filter(|o| o.customer_email.matches(&email))
        .cloned()
        .collect();
    let message = format!("Found {} order(s)", orders.len());
    Json(json!({ "data": orders, "message": message })).into_response()
}

async fn create_order(
    State(backend): State<FakeBackend>,
    Json(request): Json<CreateOrderRequest>,
) -> Response {
    if request.items.is_empty() {
        return error(StatusCode::BAD_REQUEST, "Order must contain at least one item");
    }

    let mut data = backend.lock();
    let mut total = Price::ZERO;
    for line in &request.items {
        let Some(product) = data.products.iter().find(|p| p.id == line.product_id) else {
            return error(StatusCode::NOT_FOUND, "Product not found");
        };
        if product.stock < line.quantity {
            return error(
                StatusCode::BAD_REQUEST,
                &format!("Insufficient stock for {}", product.name),
            );
        }
        total = total + product.price * line.quantity;
    }

    let order_id = OrderId::from(data.next_id("ord"));
    let mut items = Vec::with_capacity(request.items.len());
    for line in &request.items {
        let item_id = OrderItemId::from(data.next_id("item"));
        let product = data
            .products
            .iter_mut()
            .find(|p| p.id == line.product_id)
            .expect("validated above");
        product.stock -= line.quantity;
        items.push(OrderItem {
            id: item_id,
            order_id: Some(order_id.clone()),
            product_id: line.product_id.clone(),
            price: product.price,
            quantity: line.quantity,
            product: Some(product.clone()),
        });
    }

    let order = Order {
        id: order_id,
        customer_email: request.customer_email,
        total_amount: total,
        status: OrderStatus::Pending,
        stripe_payment_intent_id: None,
        created_at: Utc::now(),
        items,
    };
    data.orders.push(order.clone());
    (
        StatusCode::CREATED,
        Json(json!({ "data": order, "message": "Order created" })),
    )
        .into_response()
}

async fn update_status(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(payload): Json<UpdateOrderStatus>,
) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    let mut data = backend.lock();
    let Some(order) = data.orders.iter_mut().find(|o| o.id.as_str() == id) else {
        return (StatusCode::NOT_FOUND, Json(json!({ "error": "Order not found" })))
            .into_response();
    };
    order.status = payload.status;
    Json(json!({ "data": order, "message": "Order status updated" })).into_response()
}

async fn create_payment(State(backend): State<FakeBackend>, Path(id): Path<String>) -> Response {
    let mut data = backend.lock();
    if data.fail_payments {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Payment provider unavailable" })),
        )
            .into_response();
    }
    let Some(order) = data.orders.iter_mut().find(|o| o.id.as_str() == id) else {
        return error(StatusCode::NOT_FOUND, "Order not found");
    };
    let intent = format!("pi_{id}");
    order.stripe_payment_intent_id = Some(intent.clone());
    Json(json!({ "clientSecret": format!("{intent}_secret_test") })).into_response()
}

// =============================================================================
// Test context
// =============================================================================

/// A running storefront wired to a [`FakeBackend`].
pub struct TestContext {
    pub backend: FakeBackend,
    pub base_url: String,
    /// Cookie-keeping client that does not follow redirects.
    pub client: reqwest::Client,
}

impl TestContext {
    /// Start a fake API and a storefront with payments and admin configured.
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    /// Like [`spawn`](Self::spawn), letting the caller adjust the config.
    pub async fn spawn_with(configure: impl FnOnce(&mut StorefrontConfig)) -> Self {
        let backend = FakeBackend::new();
        let api_addr = serve(backend.router()).await;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind storefront");
        let addr = listener.local_addr().expect("storefront addr");
        let base_url = format!("http://{addr}");

        let api_base = parse_base_url(&format!("http://{api_addr}/api")).expect("api url");
        let mut config = StorefrontConfig::new(&base_url, api_base);
        config.api.token = Some(SecretString::from(API_TOKEN));
        config.payments.publishable_key = Some(PUBLISHABLE_KEY.to_string());
        config.admin.email = Some(Email::parse(ADMIN_EMAIL).expect("admin email"));
        config.admin.password_hash = Some(SecretString::from(
            hash_password(ADMIN_PASSWORD).expect("hash admin password"),
        ));
        configure(&mut config);

        let state = AppState::new(config).expect("app state");
        let app = digistore_storefront::app(state, SessionBackend::memory());
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("storefront server");
        });

        let client = reqwest::Client::builder()
            .cookie_store(true)
            .redirect(Policy::none())
            .build()
            .expect("http client");

        Self {
            backend,
            base_url,
            client,
        }
    }

    /// Absolute URL for a storefront path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.expect("GET")
    }

    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("POST")
    }

    /// Same as [`post_form`](Self::post_form) with `HX-Request: true`.
    pub async fn htmx_post(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .header("HX-Request", "true")
            .form(form)
            .send()
            .await
            .expect("HTMX POST")
    }

    /// Add one unit of a product through the cart form.
    pub async fn add_to_cart(&self, product_id: &str) {
        let resp = self
            .post_form("/cart/add", &[("product_id", product_id)])
            .await;
        assert_eq!(resp.status(), reqwest::StatusCode::SEE_OTHER);
    }

    /// Current cart badge value.
    pub async fn cart_count(&self) -> u32 {
        let body = self.get("/cart/count").await.text().await.expect("body");
        let start = body.find('>').expect("badge markup") + 1;
        let end = body.rfind("</span>").expect("badge markup");
        body[start..end].trim().parse().expect("numeric badge")
    }

    /// Log into the admin console.
    pub async fn login_admin(&self) {
        let resp = self
            .post_form(
                "/admin/login",
                &[("email", ADMIN_EMAIL), ("password", ADMIN_PASSWORD)],
            )
            .await;
        assert_eq!(resp.status(), reqwest::StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/admin/products");
    }
}

/// `Location` header of a redirect.
#[must_use]
pub fn location(resp: &reqwest::Response) -> String {
    resp.headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake api");
    let addr = listener.local_addr().expect("fake api addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("fake api server");
    });
    addr
}
