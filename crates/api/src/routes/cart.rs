//! Cart route handlers.
//!
//! All cart routes require an authenticated user. Responses carry the full
//! updated cart with live product summaries expanded onto each line, so the
//! client can re-render without a second request.

use std::collections::{BTreeMap, HashMap};

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use tamarind_core::ProductId;

use crate::db::RepositoryError;
use crate::db::carts::{CartRepository, NewCartItem};
use crate::db::products::ProductRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::cart::Cart;
use crate::models::order::ShippingAddress;
use crate::models::product::ProductSummary;
use crate::services::checkout::CheckoutService;
use crate::state::AppState;

// =============================================================================
// Request Types
// =============================================================================

/// Add-to-cart request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub product_id: Option<ProductId>,
    pub qty: Option<i32>,
    pub variant_sku: Option<String>,
    pub meta: Option<BTreeMap<String, String>>,
}

/// Remove-from-cart request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveFromCartRequest {
    pub product_id: Option<ProductId>,
    pub variant_sku: Option<String>,
}

/// Place-order request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub shipping_address: Option<ShippingAddress>,
}

// =============================================================================
// View Types
// =============================================================================

/// One cart line with its live product summary.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineView {
    pub product_id: ProductId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_sku: Option<String>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumb: Option<String>,
    pub price: Decimal,
    pub qty: i32,
    pub line_total: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<ProductSummary>,
}

/// Cart response payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub items: Vec<CartLineView>,
    pub subtotal: Decimal,
    pub item_count: i64,
}

impl CartView {
    /// An empty cart, for users who have never added anything.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            subtotal: Decimal::ZERO,
            item_count: 0,
        }
    }

    fn build(cart: Cart, summaries: HashMap<ProductId, ProductSummary>) -> Self {
        let subtotal = cart.subtotal();
        let item_count = cart.item_count();
        let items = cart
            .items
            .into_iter()
            .map(|item| {
                // Cloned because several lines can reference variants of one product
                let product = summaries.get(&item.product_id).cloned();
                CartLineView {
                    product_id: item.product_id,
                    variant_sku: item.variant_sku_opt().map(String::from),
                    title: item.title.clone(),
                    thumb: item.thumb.clone(),
                    price: item.price,
                    qty: item.qty,
                    line_total: item.line_total(),
                    meta: item.meta.map(|m| m.0),
                    product,
                }
            })
            .collect();

        Self {
            items,
            subtotal,
            item_count,
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Current cart, or an empty one if none has been persisted yet.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<impl IntoResponse> {
    let cart = CartRepository::new(state.pool())
        .get_by_user(current.id)
        .await?;

    let view = match cart {
        Some(cart) => expand(&state, cart).await?,
        None => CartView::empty(),
    };

    Ok(Json(json!({ "cart": view })))
}

/// Add a line to the cart, merging by (product, variant sku) key.
#[instrument(skip(state, body))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Json(body): Json<AddToCartRequest>,
) -> Result<impl IntoResponse> {
    let product_id = body
        .product_id
        .ok_or_else(|| AppError::BadRequest("productId is required".to_string()))?;
    let qty = body.qty.unwrap_or(1);
    if qty <= 0 {
        return Err(AppError::BadRequest(
            "qty must be a positive integer".to_string(),
        ));
    }

    let product = ProductRepository::new(state.pool())
        .get_active(product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

    let item = NewCartItem {
        product_id,
        variant_sku: body
            .variant_sku
            .map(|sku| sku.trim().to_string())
            .unwrap_or_default(),
        title: product.title.clone(),
        thumb: product.thumbnail().map(String::from),
        price: product.price,
        qty,
        meta: body.meta,
    };

    let cart = CartRepository::new(state.pool())
        .add_item(current.id, item)
        .await?;
    let view = expand(&state, cart).await?;

    Ok(Json(json!({ "cart": view })))
}

/// Remove the line matching (product, variant sku); removing an absent line
/// is a no-op.
#[instrument(skip(state, body))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Json(body): Json<RemoveFromCartRequest>,
) -> Result<impl IntoResponse> {
    let product_id = body
        .product_id
        .ok_or_else(|| AppError::BadRequest("productId is required".to_string()))?;

    let cart = CartRepository::new(state.pool())
        .remove_item(
            current.id,
            product_id,
            body.variant_sku.as_deref().map(str::trim),
        )
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound("Cart".to_string()),
            other => AppError::Database(other),
        })?;
    let view = expand(&state, cart).await?;

    Ok(Json(json!({ "cart": view })))
}

/// Convert the cart into an order.
#[instrument(skip(state, body))]
pub async fn place_order(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Json(body): Json<PlaceOrderRequest>,
) -> Result<impl IntoResponse> {
    let shipping_address = body
        .shipping_address
        .ok_or_else(|| AppError::BadRequest("Shipping address required".to_string()))?;

    let order = CheckoutService::new(state.pool())
        .place_order(current.id, shipping_address)
        .await?;

    Ok((StatusCode::CREATED, Json(json!({ "order": order }))))
}

// =============================================================================
// Helpers
// =============================================================================

/// Attach live product summaries to the cart's lines.
async fn expand(state: &AppState, cart: Cart) -> Result<CartView> {
    let ids: Vec<ProductId> = cart.items.iter().map(|item| item.product_id).collect();
    let summaries = ProductRepository::new(state.pool())
        .summaries_for(&ids)
        .await?;

    Ok(CartView::build(cart, summaries))
}
