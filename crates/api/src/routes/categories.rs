//! Category route handlers.

use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;
use tracing::instrument;

use crate::db::categories::CategoryRepository;
use crate::error::Result;
use crate::state::AppState;

/// List all active categories.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let categories = CategoryRepository::new(state.pool()).list_active().await?;

    Ok(Json(json!({ "categories": categories })))
}
