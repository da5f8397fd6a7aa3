//! Order history route handlers.
//!
//! Read-only: orders are created by checkout and their status is mutated by
//! fulfillment tooling, not through this API.

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::json;
use tracing::instrument;

use tamarind_core::OrderId;

use crate::db::orders::OrderRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// The current user's orders, newest first.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<impl IntoResponse> {
    let orders = OrderRepository::new(state.pool())
        .list_by_user(current.id)
        .await?;

    Ok(Json(json!({ "orders": orders })))
}

/// One order with its item snapshots. Orders owned by other users look like
/// missing orders.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<impl IntoResponse> {
    let order = OrderRepository::new(state.pool())
        .get_for_user(id, current.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

    Ok(Json(json!({ "order": order })))
}
