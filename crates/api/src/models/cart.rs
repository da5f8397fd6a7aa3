//! Cart domain types.
//!
//! A cart holds at most one line per (product, variant sku) key. Each line
//! snapshots the product's title, thumbnail, and unit price at the time it was
//! added; snapshots are deliberately not re-synced when the catalog changes.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;

use tamarind_core::{CartId, ProductId, UserId};

/// One line in a cart.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CartItem {
    pub product_id: ProductId,
    /// Empty string for variant-less lines (matches the storage key).
    pub variant_sku: String,
    pub title: String,
    pub thumb: Option<String>,
    /// Unit price snapshot taken when the line was added.
    pub price: Decimal,
    pub qty: i32,
    /// Free-form display attributes, e.g. `{"color": "Red", "size": "M"}`.
    pub meta: Option<Json<BTreeMap<String, String>>>,
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    /// The variant SKU, or `None` for variant-less lines.
    #[must_use]
    pub fn variant_sku_opt(&self) -> Option<&str> {
        if self.variant_sku.is_empty() {
            None
        } else {
            Some(&self.variant_sku)
        }
    }

    /// Line total: unit price snapshot times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.qty)
    }
}

/// A user's cart. Exactly one exists per user; it is cleared, never deleted,
/// when an order is placed.
#[derive(Debug, Clone)]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    pub items: Vec<CartItem>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// Sum of all line totals.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|it| i64::from(it.qty)).sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::dec;

    use super::*;

    fn item(price: Decimal, qty: i32) -> CartItem {
        CartItem {
            product_id: ProductId::new(1),
            variant_sku: String::new(),
            title: "Canvas Tote".to_string(),
            thumb: None,
            price,
            qty,
            meta: None,
            added_at: Utc::now(),
        }
    }

    #[test]
    fn test_variant_sku_opt() {
        let mut it = item(dec!(10.00), 1);
        assert_eq!(it.variant_sku_opt(), None);
        it.variant_sku = "red-m".to_string();
        assert_eq!(it.variant_sku_opt(), Some("red-m"));
    }

    #[test]
    fn test_subtotal_and_count() {
        let cart = Cart {
            id: CartId::new(1),
            user_id: UserId::new(1),
            items: vec![item(dec!(10.50), 2), item(dec!(3.25), 4)],
            updated_at: Utc::now(),
        };
        assert_eq!(cart.subtotal(), dec!(34.00));
        assert_eq!(cart.item_count(), 6);
    }
}
