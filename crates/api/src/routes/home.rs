//! Home page aggregation handler.

use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;
use tracing::instrument;

use crate::db::products::ProductRepository;
use crate::error::Result;
use crate::state::AppState;

/// Products shown per category section on the home page.
const HOME_PER_CATEGORY: i64 = 8;

/// Top products per active category, ordered by popularity then recency.
///
/// The aggregation is cached for a short TTL; the catalog is read-mostly and
/// this is the hottest read in the system.
#[instrument(skip(state))]
pub async fn home(State(state): State<AppState>) -> Result<impl IntoResponse> {
    if let Some(sections) = state.home_cache().get(&HOME_PER_CATEGORY).await {
        return Ok(Json(json!({ "sections": &*sections })));
    }

    let sections = ProductRepository::new(state.pool())
        .home_sections(HOME_PER_CATEGORY)
        .await?;
    let sections = Arc::new(sections);
    state
        .home_cache()
        .insert(HOME_PER_CATEGORY, Arc::clone(&sections))
        .await;

    Ok(Json(json!({ "sections": &*sections })))
}
