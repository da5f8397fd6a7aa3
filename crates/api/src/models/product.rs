//! Product domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

use tamarind_core::{CategoryId, ProductId};

/// A product image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductImage {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

/// A purchasable sub-configuration of a product (e.g., a color/size combo)
/// with its own stock count.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProductVariant {
    pub sku: String,
    pub color: Option<String>,
    pub size: Option<String>,
    pub stock: i32,
}

/// A catalog product.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub brand: String,
    pub category_id: CategoryId,
    pub description: Option<String>,
    pub keywords: Vec<String>,
    pub tags: Vec<String>,
    pub price: Decimal,
    /// List price for strike-through display.
    pub mrp: Option<Decimal>,
    /// Base stock count. Ignored for purchasing whenever variants exist.
    pub stock: i32,
    pub images: Json<Vec<ProductImage>>,
    pub thumb: Option<String>,
    pub rating_avg: f32,
    pub rating_count: i32,
    pub popularity: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Variants are loaded from their own table.
    #[sqlx(skip)]
    pub variants: Vec<ProductVariant>,
}

/// The stock pool a purchase draws from.
///
/// A product tracks stock either at the product level (no variants) or per
/// variant (one or more variants); the two are mutually exclusive, and all
/// purchasing logic goes through this view so the base stock column cannot be
/// consulted by accident when variants exist.
#[derive(Debug, Clone, Copy)]
pub enum StockPool<'a> {
    /// Stock tracked on the product itself.
    Simple(i32),
    /// Stock tracked per variant; product-level stock is ignored.
    PerVariant(&'a [ProductVariant]),
}

impl Product {
    /// The stock pool purchases draw from.
    #[must_use]
    pub fn stock_pool(&self) -> StockPool<'_> {
        if self.variants.is_empty() {
            StockPool::Simple(self.stock)
        } else {
            StockPool::PerVariant(&self.variants)
        }
    }

    /// Look up a variant by its SKU.
    #[must_use]
    pub fn find_variant(&self, sku: &str) -> Option<&ProductVariant> {
        self.variants.iter().find(|v| v.sku == sku)
    }

    /// Discount percentage derived from the list price, 0 when there is none.
    #[must_use]
    pub fn discount_percent(&self) -> u32 {
        let Some(mrp) = self.mrp else { return 0 };
        if mrp <= Decimal::ZERO {
            return 0;
        }
        let percent = (Decimal::ONE - self.price / mrp) * Decimal::ONE_HUNDRED;
        percent.round().to_u32().unwrap_or(0)
    }

    /// Whether any unit is purchasable across all stock pools.
    #[must_use]
    pub fn in_stock(&self) -> bool {
        match self.stock_pool() {
            StockPool::Simple(stock) => stock > 0,
            StockPool::PerVariant(variants) => variants.iter().any(|v| v.stock > 0),
        }
    }

    /// Best available thumbnail: the dedicated thumb or the first image.
    #[must_use]
    pub fn thumbnail(&self) -> Option<&str> {
        self.thumb
            .as_deref()
            .or_else(|| self.images.first().map(|img| img.url.as_str()))
    }
}

/// Live product facts attached to cart lines for display, alongside the
/// snapshotted title/price.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub brand: String,
    pub rating_avg: f32,
    pub rating_count: i32,
    pub stock: i32,
    pub is_active: bool,
    pub variants: Vec<ProductVariant>,
}

/// One home-page section: a category and its top products.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeSection {
    pub category: crate::models::category::Category,
    pub products: Vec<Product>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::dec;

    use super::*;

    fn product(stock: i32, variants: Vec<ProductVariant>) -> Product {
        Product {
            id: ProductId::new(1),
            title: "Trail Runner".to_string(),
            brand: "Summit".to_string(),
            category_id: CategoryId::new(1),
            description: None,
            keywords: vec![],
            tags: vec![],
            price: dec!(80.00),
            mrp: None,
            stock,
            images: Json(vec![]),
            thumb: None,
            rating_avg: 0.0,
            rating_count: 0,
            popularity: 0,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            variants,
        }
    }

    fn variant(sku: &str, stock: i32) -> ProductVariant {
        ProductVariant {
            sku: sku.to_string(),
            color: None,
            size: None,
            stock,
        }
    }

    #[test]
    fn test_stock_pool_simple_without_variants() {
        let p = product(5, vec![]);
        assert!(matches!(p.stock_pool(), StockPool::Simple(5)));
        assert!(p.in_stock());
    }

    #[test]
    fn test_stock_pool_ignores_base_stock_with_variants() {
        // Base stock is nonzero but only variant stock counts
        let p = product(10, vec![variant("red-m", 0)]);
        assert!(matches!(p.stock_pool(), StockPool::PerVariant(_)));
        assert!(!p.in_stock());
    }

    #[test]
    fn test_find_variant() {
        let p = product(0, vec![variant("red-m", 1), variant("blue-l", 2)]);
        assert_eq!(p.find_variant("blue-l").unwrap().stock, 2);
        assert!(p.find_variant("green-s").is_none());
    }

    #[test]
    fn test_discount_percent() {
        let mut p = product(1, vec![]);
        assert_eq!(p.discount_percent(), 0);

        p.mrp = Some(dec!(100.00));
        assert_eq!(p.discount_percent(), 20);

        p.mrp = Some(dec!(0.00));
        assert_eq!(p.discount_percent(), 0);
    }

    #[test]
    fn test_thumbnail_falls_back_to_first_image() {
        let mut p = product(1, vec![]);
        assert!(p.thumbnail().is_none());

        p.images = Json(vec![ProductImage {
            url: "https://img.example/1.jpg".to_string(),
            alt: None,
        }]);
        assert_eq!(p.thumbnail(), Some("https://img.example/1.jpg"));

        p.thumb = Some("https://img.example/thumb.jpg".to_string());
        assert_eq!(p.thumbnail(), Some("https://img.example/thumb.jpg"));
    }
}
