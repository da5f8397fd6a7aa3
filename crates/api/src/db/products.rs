//! Product repository for catalog reads and stock mutation.
//!
//! Listing uses `QueryBuilder` because the filter set is dynamic; everything
//! else is a plain parameterized query. Stock decrements are conditional
//! (`AND stock >= qty`) so two concurrent checkouts can never drive a count
//! negative - the loser of the race simply affects zero rows.

use std::collections::HashMap;

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use tamarind_core::{CategoryId, ProductId};

use super::RepositoryError;
use crate::models::product::{HomeSection, Product, ProductSummary, ProductVariant};

const PRODUCT_COLUMNS: &str = "p.id, p.title, p.brand, p.category_id, p.description, p.keywords, \
     p.tags, p.price, p.mrp, p.stock, p.images, p.thumb, p.rating_avg, p.rating_count, \
     p.popularity, p.is_active, p.created_at, p.updated_at";

/// Sort orders accepted by the product listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Most popular first, newest breaking ties.
    #[default]
    Popularity,
    /// Newest first.
    Newest,
    /// Cheapest first.
    PriceAsc,
    /// Most expensive first.
    PriceDesc,
    /// Best rated first.
    Rating,
    /// Alphabetical.
    Title,
}

impl SortKey {
    /// Parse a sort parameter; unknown values fall back to the default.
    #[must_use]
    pub fn from_param(s: &str) -> Self {
        match s {
            "newest" => Self::Newest,
            "price_asc" => Self::PriceAsc,
            "price_desc" => Self::PriceDesc,
            "rating" => Self::Rating,
            "title" => Self::Title,
            _ => Self::Popularity,
        }
    }

    /// The ORDER BY clause for this key (whitelisted, never interpolated from
    /// user input).
    const fn order_by(self) -> &'static str {
        match self {
            Self::Popularity => "p.popularity DESC, p.created_at DESC",
            Self::Newest => "p.created_at DESC",
            Self::PriceAsc => "p.price ASC",
            Self::PriceDesc => "p.price DESC",
            Self::Rating => "p.rating_avg DESC, p.rating_count DESC",
            Self::Title => "p.title ASC",
        }
    }
}

/// A normalized product listing query. Filters are ANDed together;
/// multi-value filters (brands, tags) are ORed within themselves.
#[derive(Debug, Clone, Default)]
pub struct ProductListQuery {
    pub q: Option<String>,
    pub brands: Vec<String>,
    pub tags: Vec<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub category_id: Option<CategoryId>,
    pub page: u32,
    pub limit: u32,
    pub sort: SortKey,
}

impl ProductListQuery {
    /// Page size when the client does not send one.
    pub const DEFAULT_LIMIT: u32 = 24;
    /// Largest page size a client can request.
    pub const MAX_LIMIT: u32 = 100;

    /// Build a query with page and limit normalized into their valid ranges.
    #[must_use]
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit
                .unwrap_or(Self::DEFAULT_LIMIT)
                .clamp(1, Self::MAX_LIMIT),
            ..Self::default()
        }
    }

    /// Row offset for the current page.
    #[must_use]
    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.limit)
    }
}

/// Repository for product reads and stock mutation.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a product by ID with its variants, regardless of active flag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM product p WHERE p.id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        match product {
            Some(mut p) => {
                self.attach_variants(std::slice::from_mut(&mut p)).await?;
                Ok(Some(p))
            }
            None => Ok(None),
        }
    }

    /// Get an active product by ID with its variants.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_active(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.get_by_id(id).await?.filter(|p| p.is_active))
    }

    /// List active products matching the query. Returns the page of products
    /// and the total match count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        query: &ProductListQuery,
    ) -> Result<(Vec<Product>, i64), RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {PRODUCT_COLUMNS} FROM product p WHERE p.is_active = TRUE"
        ));
        push_filters(&mut qb, query);
        qb.push(" ORDER BY ");
        qb.push(query.sort.order_by());
        qb.push(" LIMIT ");
        qb.push_bind(i64::from(query.limit));
        qb.push(" OFFSET ");
        qb.push_bind(query.offset());

        let mut products = qb
            .build_query_as::<Product>()
            .fetch_all(self.pool)
            .await?;
        self.attach_variants(&mut products).await?;

        let mut count_qb = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM product p WHERE p.is_active = TRUE",
        );
        push_filters(&mut count_qb, query);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(self.pool)
            .await?;

        Ok((products, total))
    }

    /// Top-N active products per active category, ordered by popularity then
    /// recency within each section.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn home_sections(
        &self,
        per_category: i64,
    ) -> Result<Vec<HomeSection>, RepositoryError> {
        let categories = super::CategoryRepository::new(self.pool).list_active().await?;

        let mut products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM ( \
                 SELECT *, ROW_NUMBER() OVER ( \
                     PARTITION BY category_id \
                     ORDER BY popularity DESC, created_at DESC \
                 ) AS rn \
                 FROM product WHERE is_active = TRUE \
             ) p WHERE p.rn <= $1 \
             ORDER BY p.category_id, p.rn"
        ))
        .bind(per_category)
        .fetch_all(self.pool)
        .await?;
        self.attach_variants(&mut products).await?;

        let mut by_category: HashMap<CategoryId, Vec<Product>> = HashMap::new();
        for product in products {
            by_category
                .entry(product.category_id)
                .or_default()
                .push(product);
        }

        Ok(categories
            .into_iter()
            .filter_map(|category| {
                by_category.remove(&category.id).map(|products| HomeSection {
                    category,
                    products,
                })
            })
            .collect())
    }

    /// Live facts (brand, rating, stock, variants) for a set of products,
    /// keyed by product ID. Used to expand cart lines for display.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn summaries_for(
        &self,
        ids: &[ProductId],
    ) -> Result<HashMap<ProductId, ProductSummary>, RepositoryError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let raw_ids: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();

        let rows = sqlx::query_as::<_, (i32, String, f32, i32, i32, bool)>(
            "SELECT id, brand, rating_avg, rating_count, stock, is_active \
             FROM product WHERE id = ANY($1)",
        )
        .bind(&raw_ids)
        .fetch_all(self.pool)
        .await?;

        let mut summaries: HashMap<ProductId, ProductSummary> = rows
            .into_iter()
            .map(|(id, brand, rating_avg, rating_count, stock, is_active)| {
                (
                    ProductId::new(id),
                    ProductSummary {
                        brand,
                        rating_avg,
                        rating_count,
                        stock,
                        is_active,
                        variants: Vec::new(),
                    },
                )
            })
            .collect();

        let variant_rows = sqlx::query_as::<_, (i32, String, Option<String>, Option<String>, i32)>(
            "SELECT product_id, sku, color, size, stock \
             FROM product_variant WHERE product_id = ANY($1) ORDER BY id",
        )
        .bind(&raw_ids)
        .fetch_all(self.pool)
        .await?;

        for (product_id, sku, color, size, stock) in variant_rows {
            if let Some(summary) = summaries.get_mut(&ProductId::new(product_id)) {
                summary.variants.push(ProductVariant {
                    sku,
                    color,
                    size,
                    stock,
                });
            }
        }

        Ok(summaries)
    }

    /// Load variants for a batch of products in one query.
    async fn attach_variants(&self, products: &mut [Product]) -> Result<(), RepositoryError> {
        if products.is_empty() {
            return Ok(());
        }
        let ids: Vec<i32> = products.iter().map(|p| p.id.as_i32()).collect();

        let rows = sqlx::query_as::<_, (i32, String, Option<String>, Option<String>, i32)>(
            "SELECT product_id, sku, color, size, stock \
             FROM product_variant WHERE product_id = ANY($1) ORDER BY id",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let mut by_product: HashMap<ProductId, Vec<ProductVariant>> = HashMap::new();
        for (product_id, sku, color, size, stock) in rows {
            by_product
                .entry(ProductId::new(product_id))
                .or_default()
                .push(ProductVariant {
                    sku,
                    color,
                    size,
                    stock,
                });
        }

        for product in products {
            product.variants = by_product.remove(&product.id).unwrap_or_default();
        }

        Ok(())
    }

    // =========================================================================
    // Checkout commit-pass helpers (transaction-scoped)
    // =========================================================================

    /// Conditionally decrement the stock backing (product, variant sku).
    ///
    /// Returns `false` when the current stock is below `qty` - the row is left
    /// untouched, which is what keeps stock non-negative under concurrent
    /// checkouts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn decrement_stock(
        conn: &mut PgConnection,
        product_id: ProductId,
        variant_sku: Option<&str>,
        qty: i32,
    ) -> Result<bool, RepositoryError> {
        let result = match variant_sku {
            Some(sku) => {
                sqlx::query(
                    "UPDATE product_variant SET stock = stock - $1 \
                     WHERE product_id = $2 AND sku = $3 AND stock >= $1",
                )
                .bind(qty)
                .bind(product_id.as_i32())
                .bind(sku)
                .execute(&mut *conn)
                .await?
            }
            None => {
                sqlx::query(
                    "UPDATE product SET stock = stock - $1, updated_at = now() \
                     WHERE id = $2 AND stock >= $1",
                )
                .bind(qty)
                .bind(product_id.as_i32())
                .execute(&mut *conn)
                .await?
            }
        };

        Ok(result.rows_affected() > 0)
    }

    /// Current stock level for (product, variant sku); 0 when the row is gone.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn stock_level(
        conn: &mut PgConnection,
        product_id: ProductId,
        variant_sku: Option<&str>,
    ) -> Result<i32, RepositoryError> {
        let level: Option<i32> = match variant_sku {
            Some(sku) => {
                sqlx::query_scalar(
                    "SELECT stock FROM product_variant WHERE product_id = $1 AND sku = $2",
                )
                .bind(product_id.as_i32())
                .bind(sku)
                .fetch_optional(&mut *conn)
                .await?
            }
            None => {
                sqlx::query_scalar("SELECT stock FROM product WHERE id = $1")
                    .bind(product_id.as_i32())
                    .fetch_optional(&mut *conn)
                    .await?
            }
        };

        Ok(level.unwrap_or(0))
    }
}

/// Append the shared WHERE filters for listing and counting.
fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &ProductListQuery) {
    if let Some(category_id) = query.category_id {
        qb.push(" AND p.category_id = ");
        qb.push_bind(category_id.as_i32());
    }

    if let Some(q) = query.q.as_deref() {
        let q = q.trim();
        if !q.is_empty() {
            let pattern = format!("%{q}%");
            qb.push(" AND (p.title ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR p.brand ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR array_to_string(p.keywords, ' ') ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR array_to_string(p.tags, ' ') ILIKE ");
            qb.push_bind(pattern);
            qb.push(")");
        }
    }

    if !query.brands.is_empty() {
        qb.push(" AND p.brand = ANY(");
        qb.push_bind(query.brands.clone());
        qb.push(")");
    }

    // && is array overlap: any requested tag matches
    if !query.tags.is_empty() {
        qb.push(" AND p.tags && ");
        qb.push_bind(query.tags.clone());
    }

    if let Some(min) = query.min_price {
        qb.push(" AND p.price >= ");
        qb.push_bind(min);
    }

    if let Some(max) = query.max_price {
        qb.push(" AND p.price <= ");
        qb.push_bind(max);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_defaults() {
        let q = ProductListQuery::new(None, None);
        assert_eq!(q.page, 1);
        assert_eq!(q.limit, ProductListQuery::DEFAULT_LIMIT);
        assert_eq!(q.offset(), 0);
    }

    #[test]
    fn test_list_query_clamps_page_and_limit() {
        let q = ProductListQuery::new(Some(0), Some(0));
        assert_eq!(q.page, 1);
        assert_eq!(q.limit, 1);

        let q = ProductListQuery::new(Some(3), Some(500));
        assert_eq!(q.page, 3);
        assert_eq!(q.limit, ProductListQuery::MAX_LIMIT);
        assert_eq!(q.offset(), 200);
    }

    #[test]
    fn test_sort_key_parsing() {
        assert_eq!(SortKey::from_param("price_asc"), SortKey::PriceAsc);
        assert_eq!(SortKey::from_param("newest"), SortKey::Newest);
        // Unknown values fall back to the default ordering
        assert_eq!(SortKey::from_param("bogus"), SortKey::Popularity);
    }

    #[test]
    fn test_push_filters_composes_sql() {
        let query = ProductListQuery {
            q: Some("trail".to_string()),
            brands: vec!["Summit".to_string()],
            tags: vec!["running".to_string(), "outdoor".to_string()],
            min_price: Some(Decimal::new(1000, 2)),
            max_price: Some(Decimal::new(20000, 2)),
            category_id: Some(CategoryId::new(4)),
            ..ProductListQuery::new(None, None)
        };

        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 WHERE TRUE");
        push_filters(&mut qb, &query);
        let sql = qb.sql();

        assert!(sql.contains("p.category_id ="));
        assert!(sql.contains("p.title ILIKE"));
        assert!(sql.contains("p.brand = ANY("));
        assert!(sql.contains("p.tags &&"));
        assert!(sql.contains("p.price >="));
        assert!(sql.contains("p.price <="));
    }

    #[test]
    fn test_push_filters_skips_blank_search() {
        let query = ProductListQuery {
            q: Some("   ".to_string()),
            ..ProductListQuery::new(None, None)
        };

        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 WHERE TRUE");
        push_filters(&mut qb, &query);
        assert_eq!(qb.sql(), "SELECT 1 WHERE TRUE");
    }
}
