//! HTTP route handlers for the API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (database ping)
//!
//! # Auth
//! POST /api/auth/signup        - Create an account, issue a session
//! POST /api/auth/login         - Password login, issue a session
//! POST /api/auth/logout        - Clear the session (requires auth)
//! GET  /api/auth/profile       - Current user + saved addresses (requires auth)
//! POST /api/auth/add-address   - Save a shipping address (requires auth)
//!
//! # Catalog
//! GET  /api/home               - Top products per active category
//! GET  /api/categories         - Active categories
//! GET  /api/products           - Filtered/paginated product listing
//! GET  /api/products/{id}      - Product detail
//!
//! # Cart (requires auth)
//! GET  /api/cart               - Current cart with product summaries
//! POST /api/cart/add           - Add/merge a line item
//! POST /api/cart/remove        - Remove a line item
//! POST /api/cart/place-order   - Convert the cart into an order
//!
//! # Orders (requires auth)
//! GET  /api/orders             - Order history, newest first
//! GET  /api/orders/{id}        - One order with item snapshots
//! ```

pub mod auth;
pub mod cart;
pub mod categories;
pub mod home;
pub mod orders;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/profile", get(auth::profile))
        .route("/add-address", post(auth::add_address))
}

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/home", get(home::home))
        .route("/categories", get(categories::index))
        .route("/products", get(products::index))
        .route("/products/{id}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/remove", post(cart::remove))
        .route("/place-order", post(cart::place_order))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{id}", get(orders::show))
}

/// Create all routes for the API.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api/auth", auth_routes())
        .nest("/api/cart", cart_routes())
        .nest("/api/orders", order_routes())
        .nest("/api", catalog_routes())
}
