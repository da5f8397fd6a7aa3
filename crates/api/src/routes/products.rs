//! Product route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use tamarind_core::{CategoryId, ProductId};

use crate::db::products::{ProductListQuery, ProductRepository, SortKey};
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Product listing query parameters. Multi-value filters (`brand`, `tags`)
/// are comma-separated.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductsQuery {
    pub q: Option<String>,
    pub brand: Option<String>,
    pub tags: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub category_id: Option<CategoryId>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort: Option<String>,
}

/// Filtered, paginated product listing.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(params): Query<ProductsQuery>,
) -> Result<impl IntoResponse> {
    let mut query = ProductListQuery::new(params.page, params.limit);
    query.q = params.q;
    query.brands = split_csv(params.brand.as_deref());
    query.tags = split_csv(params.tags.as_deref());
    query.min_price = params.min_price;
    query.max_price = params.max_price;
    query.category_id = params.category_id;
    query.sort = params
        .sort
        .as_deref()
        .map(SortKey::from_param)
        .unwrap_or_default();

    let (products, total) = ProductRepository::new(state.pool()).list(&query).await?;

    Ok(Json(json!({
        "products": products,
        "total": total,
        "page": query.page,
        "limit": query.limit,
    })))
}

/// Product detail. Inactive products are indistinguishable from missing ones.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<impl IntoResponse> {
    let product = ProductRepository::new(state.pool())
        .get_active(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

    Ok(Json(json!({ "product": product })))
}

/// Split a comma-separated filter into its non-blank values.
fn split_csv(value: Option<&str>) -> Vec<String> {
    value
        .map(|s| {
            s.split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_csv() {
        assert_eq!(split_csv(None), Vec::<String>::new());
        assert_eq!(split_csv(Some("")), Vec::<String>::new());
        assert_eq!(
            split_csv(Some("Summit, Cascade ,,")),
            vec!["Summit".to_string(), "Cascade".to_string()]
        );
    }
}
