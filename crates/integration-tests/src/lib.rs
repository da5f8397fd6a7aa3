//! Integration test helpers for Tamarind Market.
//!
//! # Running Tests
//!
//! These tests exercise a live server over HTTP and need:
//! - A running `PostgreSQL` database with migrations applied
//!   (`cargo run -p tamarind-cli -- migrate`)
//! - The API server running (`cargo run -p tamarind-api`)
//!
//! ```bash
//! cargo test -p tamarind-integration-tests -- --ignored
//! ```
//!
//! Catalog fixtures are written straight to the database (products and
//! variants have no public write API), carts and orders go through HTTP.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use reqwest::Client;
use serde_json::{Value, json};
use sqlx::PgPool;
use uuid::Uuid;

/// Base URL for the API (configurable via environment).
#[must_use]
pub fn base_url() -> String {
    std::env::var("TAMARIND_API_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Connect to the database the server is using.
///
/// # Panics
///
/// Panics if no database URL is configured or the connection fails.
pub async fn db_pool() -> PgPool {
    let url = std::env::var("TAMARIND_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .expect("TAMARIND_DATABASE_URL must be set for integration tests");
    PgPool::connect(&url)
        .await
        .expect("Failed to connect to test database")
}

/// A fresh HTTP client with its own cookie jar (one session per client).
#[must_use]
pub fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// Sign up a brand-new user on the given client and return the response
/// user object. The client's cookie jar now carries the session.
pub async fn signup(client: &Client) -> Value {
    let suffix = Uuid::new_v4().simple().to_string();
    let email = format!("shopper-{suffix}@example.com");
    // Unique 10-digit phone derived from the uuid
    let phone = format!("9{:09}", Uuid::new_v4().as_u128() % 1_000_000_000);

    let resp = client
        .post(format!("{}/api/auth/signup", base_url()))
        .json(&json!({
            "name": "Test Shopper",
            "email": email,
            "password": "Sup3r!ok",
            "phone": phone,
        }))
        .send()
        .await
        .expect("signup request failed");

    assert_eq!(resp.status(), 201, "signup should succeed");
    let body: Value = resp.json().await.expect("signup response not JSON");
    body["user"].clone()
}

/// Insert a category fixture; returns its id.
pub async fn create_category(pool: &PgPool) -> i32 {
    let name = format!("Category {}", Uuid::new_v4().simple());
    sqlx::query_scalar("INSERT INTO category (name) VALUES ($1) RETURNING id")
        .bind(name)
        .fetch_one(pool)
        .await
        .expect("failed to insert category")
}

/// Insert a product fixture; returns its id. `price` is a numeric literal
/// like "80.00".
pub async fn create_product(pool: &PgPool, category_id: i32, price: &str, stock: i32) -> i32 {
    let title = format!("Product {}", Uuid::new_v4().simple());
    sqlx::query_scalar(
        "INSERT INTO product (title, brand, category_id, price, stock) \
         VALUES ($1, 'TestBrand', $2, $3::numeric, $4) RETURNING id",
    )
    .bind(title)
    .bind(category_id)
    .bind(price)
    .bind(stock)
    .fetch_one(pool)
    .await
    .expect("failed to insert product")
}

/// Insert a variant fixture for a product.
pub async fn create_variant(pool: &PgPool, product_id: i32, sku: &str, stock: i32) {
    sqlx::query("INSERT INTO product_variant (product_id, sku, stock) VALUES ($1, $2, $3)")
        .bind(product_id)
        .bind(sku)
        .bind(stock)
        .execute(pool)
        .await
        .expect("failed to insert variant");
}

/// Update a product's catalog price (for snapshot-stability tests).
pub async fn set_product_price(pool: &PgPool, product_id: i32, price: &str) {
    sqlx::query("UPDATE product SET price = $1::numeric WHERE id = $2")
        .bind(price)
        .bind(product_id)
        .execute(pool)
        .await
        .expect("failed to update price");
}

/// Current base stock of a product.
pub async fn product_stock(pool: &PgPool, product_id: i32) -> i32 {
    sqlx::query_scalar("SELECT stock FROM product WHERE id = $1")
        .bind(product_id)
        .fetch_one(pool)
        .await
        .expect("failed to read product stock")
}

/// Current stock of a variant.
pub async fn variant_stock(pool: &PgPool, product_id: i32, sku: &str) -> i32 {
    sqlx::query_scalar("SELECT stock FROM product_variant WHERE product_id = $1 AND sku = $2")
        .bind(product_id)
        .bind(sku)
        .fetch_one(pool)
        .await
        .expect("failed to read variant stock")
}

/// Add a line to the current session's cart via the API.
pub async fn add_to_cart(client: &Client, product_id: i32, qty: i32, variant_sku: Option<&str>) -> Value {
    let mut body = json!({ "productId": product_id, "qty": qty });
    if let Some(sku) = variant_sku {
        body["variantSku"] = json!(sku);
    }

    let resp = client
        .post(format!("{}/api/cart/add", base_url()))
        .json(&body)
        .send()
        .await
        .expect("cart add request failed");

    assert_eq!(resp.status(), 200, "cart add should succeed");
    let body: Value = resp.json().await.expect("cart response not JSON");
    body["cart"].clone()
}

/// A valid shipping address body for place-order requests.
#[must_use]
pub fn shipping_address() -> Value {
    json!({
        "line1": "12 Hill Road",
        "city": "Pune",
        "state": "MH",
        "zip": "411001",
    })
}

/// Place an order for the current session; returns the raw response.
pub async fn place_order(client: &Client) -> reqwest::Response {
    client
        .post(format!("{}/api/cart/place-order", base_url()))
        .json(&json!({ "shippingAddress": shipping_address() }))
        .send()
        .await
        .expect("place-order request failed")
}

/// Fetch the current session's cart.
pub async fn get_cart(client: &Client) -> Value {
    let resp = client
        .get(format!("{}/api/cart", base_url()))
        .send()
        .await
        .expect("cart get request failed");

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("cart response not JSON");
    body["cart"].clone()
}
