//! Integration tests for cart line-item management.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied
//! - The API server running (cargo run -p tamarind-api)
//!
//! Run with: cargo test -p tamarind-integration-tests -- --ignored

#![allow(clippy::unwrap_used, clippy::expect_used)]

use serde_json::json;

use tamarind_integration_tests::{
    add_to_cart, base_url, client, create_category, create_product, db_pool, get_cart,
    set_product_price, signup,
};

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_cart_requires_authentication() {
    let anonymous = client();
    let resp = anonymous
        .get(format!("{}/api/cart", base_url()))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Unauthorized");
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_add_merges_lines_by_product_and_variant_key() {
    let pool = db_pool().await;
    let category = create_category(&pool).await;
    let product = create_product(&pool, category, "15.00", 50).await;

    let http = client();
    signup(&http).await;

    // Same key twice: qty 2 then qty 3 must merge into one line of 5
    add_to_cart(&http, product, 2, None).await;
    let cart = add_to_cart(&http, product, 3, None).await;

    let items = cart["items"].as_array().unwrap();
    assert_eq!(items.len(), 1, "same key must merge, not duplicate");
    assert_eq!(items[0]["qty"], 5);
    assert_eq!(items[0]["lineTotal"], "75.00");
    assert_eq!(cart["subtotal"], "75.00");
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_price_snapshot_survives_catalog_change() {
    let pool = db_pool().await;
    let category = create_category(&pool).await;
    let product = create_product(&pool, category, "20.00", 10).await;

    let http = client();
    signup(&http).await;

    let cart = add_to_cart(&http, product, 2, None).await;
    assert_eq!(cart["items"][0]["price"], "20.00");

    // Catalog price changes mid-session; the cart line keeps its snapshot
    set_product_price(&pool, product, "99.00").await;

    let cart = get_cart(&http).await;
    assert_eq!(cart["items"][0]["price"], "20.00");
    assert_eq!(cart["subtotal"], "40.00");
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_remove_missing_line_is_a_no_op() {
    let pool = db_pool().await;
    let category = create_category(&pool).await;
    let product = create_product(&pool, category, "10.00", 10).await;
    let other = create_product(&pool, category, "11.00", 10).await;

    let http = client();
    signup(&http).await;
    add_to_cart(&http, product, 1, None).await;

    // Removing a product that was never added succeeds and leaves the cart alone
    let resp = http
        .post(format!("{}/api/cart/remove", base_url()))
        .json(&json!({ "productId": other }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let cart = get_cart(&http).await;
    assert_eq!(cart["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_add_rejects_bad_input() {
    let pool = db_pool().await;
    let category = create_category(&pool).await;
    let product = create_product(&pool, category, "10.00", 10).await;

    let http = client();
    signup(&http).await;

    // Non-positive qty
    let resp = http
        .post(format!("{}/api/cart/add", base_url()))
        .json(&json!({ "productId": product, "qty": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // Unknown product
    let resp = http
        .post(format!("{}/api/cart/add", base_url()))
        .json(&json!({ "productId": 999_999_999, "qty": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}
