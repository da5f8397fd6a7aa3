//! Checkout service: converts a cart into an order.
//!
//! Placement runs in two phases. The validation pass is read-only: every line
//! is checked against a freshly-fetched product (fetched at most once per
//! distinct product, so multiple variant lines of one product see the same
//! snapshot), in cart order, and the first failing line decides the error.
//! Nothing has been written when validation fails.
//!
//! The commit pass runs inside a single transaction: conditional stock
//! decrements, the order insert, and the cart clear either all land or none
//! do. Each decrement is guarded with `stock >= qty`, so a concurrent
//! checkout that raced past validation affects zero rows here and aborts the
//! whole transaction instead of driving stock negative.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde_json::json;
use sqlx::PgPool;
use thiserror::Error;

use tamarind_core::{ProductId, UserId};

use crate::db::carts::CartRepository;
use crate::db::orders::OrderRepository;
use crate::db::products::ProductRepository;
use crate::db::RepositoryError;
use crate::models::cart::CartItem;
use crate::models::order::{Order, OrderAmounts, OrderItem, ShippingAddress};
use crate::models::product::{Product, StockPool};

/// Errors that can occur while placing an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The shipping address is missing a required field.
    #[error("shipping address is missing required field: {0}")]
    MissingAddressField(&'static str),

    /// The user has no cart, or the cart has no lines.
    #[error("cart is empty")]
    EmptyCart,

    /// A cart line references a product that no longer exists or is inactive.
    #[error("product {product_id} is unavailable")]
    ProductUnavailable { product_id: ProductId },

    /// A cart line references a variant SKU the product does not have.
    #[error("variant {sku} not found for product {product_id}")]
    VariantNotFound { product_id: ProductId, sku: String },

    /// The stock pool backing a cart line cannot cover its quantity.
    #[error("insufficient stock for product {product_id}")]
    InsufficientStock {
        product_id: ProductId,
        variant_sku: Option<String>,
        requested: i32,
        available: i32,
    },

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl CheckoutError {
    /// Structured detail for conflict responses, so clients can show which
    /// product/variant failed and how much stock is left.
    #[must_use]
    pub fn conflict_detail(&self) -> Option<serde_json::Value> {
        match self {
            Self::ProductUnavailable { product_id } => Some(json!({ "product": product_id })),
            Self::VariantNotFound { product_id, sku } => {
                Some(json!({ "product": product_id, "variantSku": sku }))
            }
            Self::InsufficientStock {
                product_id,
                variant_sku,
                requested,
                available,
            } => Some(json!({
                "product": product_id,
                "variantSku": variant_sku,
                "requested": requested,
                "available": available,
            })),
            _ => None,
        }
    }
}

/// Checkout service.
pub struct CheckoutService<'a> {
    pool: &'a PgPool,
}

impl<'a> CheckoutService<'a> {
    /// Create a new checkout service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Place an order from the user's cart.
    ///
    /// On success the product stock has been decremented, the order exists
    /// with status `created`, and the cart is empty. On any error nothing has
    /// changed.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure in cart order, or
    /// `CheckoutError::Repository` on storage failures.
    pub async fn place_order(
        &self,
        user_id: UserId,
        shipping_address: ShippingAddress,
    ) -> Result<Order, CheckoutError> {
        if let Some(field) = shipping_address.missing_field() {
            return Err(CheckoutError::MissingAddressField(field));
        }

        let cart = CartRepository::new(self.pool)
            .get_by_user(user_id)
            .await?
            .ok_or(CheckoutError::EmptyCart)?;
        if cart.items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        // Validation pass (read-only). Fetch each distinct product once so
        // every line of the same product validates against one snapshot.
        let repo = ProductRepository::new(self.pool);
        let mut products: HashMap<ProductId, Product> = HashMap::new();
        for item in &cart.items {
            if products.contains_key(&item.product_id) {
                continue;
            }
            if let Some(product) = repo.get_by_id(item.product_id).await? {
                products.insert(item.product_id, product);
            }
        }
        validate_lines(&cart.items, &products)?;

        let items = snapshot_items(&cart.items);
        let amounts = compute_amounts(&items);

        // Commit pass: everything below is one transaction.
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        for item in &cart.items {
            let sku = item.variant_sku_opt();
            let decremented =
                ProductRepository::decrement_stock(&mut tx, item.product_id, sku, item.qty)
                    .await?;
            if !decremented {
                // A concurrent checkout won the race since our validation
                // pass. Dropping the transaction rolls back earlier lines.
                let available =
                    ProductRepository::stock_level(&mut tx, item.product_id, sku).await?;
                return Err(CheckoutError::InsufficientStock {
                    product_id: item.product_id,
                    variant_sku: sku.map(String::from),
                    requested: item.qty,
                    available,
                });
            }
        }

        let order =
            OrderRepository::create(&mut tx, user_id, items, amounts, shipping_address).await?;
        CartRepository::clear(&mut tx, cart.id).await?;

        tx.commit().await.map_err(RepositoryError::from)?;

        Ok(order)
    }
}

/// Check every cart line against the fetched products, in cart order. The
/// first failing line determines the error; no partial reporting.
fn validate_lines(
    items: &[CartItem],
    products: &HashMap<ProductId, Product>,
) -> Result<(), CheckoutError> {
    for item in items {
        let product = products
            .get(&item.product_id)
            .filter(|p| p.is_active)
            .ok_or(CheckoutError::ProductUnavailable {
                product_id: item.product_id,
            })?;

        match (item.variant_sku_opt(), product.stock_pool()) {
            (None, StockPool::Simple(stock)) => {
                if stock < item.qty {
                    return Err(CheckoutError::InsufficientStock {
                        product_id: item.product_id,
                        variant_sku: None,
                        requested: item.qty,
                        available: stock,
                    });
                }
            }
            // Base stock is not a purchasable pool once variants exist.
            (None, StockPool::PerVariant(_)) => {
                return Err(CheckoutError::InsufficientStock {
                    product_id: item.product_id,
                    variant_sku: None,
                    requested: item.qty,
                    available: 0,
                });
            }
            (Some(sku), StockPool::Simple(_)) => {
                return Err(CheckoutError::VariantNotFound {
                    product_id: item.product_id,
                    sku: sku.to_string(),
                });
            }
            (Some(sku), StockPool::PerVariant(_)) => {
                let variant =
                    product
                        .find_variant(sku)
                        .ok_or_else(|| CheckoutError::VariantNotFound {
                            product_id: item.product_id,
                            sku: sku.to_string(),
                        })?;
                if variant.stock < item.qty {
                    return Err(CheckoutError::InsufficientStock {
                        product_id: item.product_id,
                        variant_sku: Some(sku.to_string()),
                        requested: item.qty,
                        available: variant.stock,
                    });
                }
            }
        }
    }

    Ok(())
}

/// Copy cart lines into order item snapshots.
fn snapshot_items(items: &[CartItem]) -> Vec<OrderItem> {
    items
        .iter()
        .map(|item| OrderItem {
            product_id: item.product_id,
            variant_sku: item.variant_sku_opt().map(String::from),
            title: item.title.clone(),
            price: item.price,
            qty: item.qty,
            thumb: item.thumb.clone(),
        })
        .collect()
}

/// Compute the amounts block. Shipping is flat zero for now.
fn compute_amounts(items: &[OrderItem]) -> OrderAmounts {
    let subtotal: Decimal = items.iter().map(OrderItem::line_total).sum();
    let shipping = Decimal::ZERO;
    OrderAmounts {
        subtotal,
        total: subtotal + shipping,
        shipping,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use rust_decimal::dec;
    use sqlx::types::Json;

    use tamarind_core::CategoryId;

    use super::*;
    use crate::models::product::ProductVariant;

    fn product(id: i32, stock: i32, variants: Vec<ProductVariant>) -> Product {
        Product {
            id: ProductId::new(id),
            title: format!("Product {id}"),
            brand: "Summit".to_string(),
            category_id: CategoryId::new(1),
            description: None,
            keywords: vec![],
            tags: vec![],
            price: dec!(50.00),
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

    fn line(product_id: i32, sku: &str, price: Decimal, qty: i32) -> CartItem {
        CartItem {
            product_id: ProductId::new(product_id),
            variant_sku: sku.to_string(),
            title: format!("Product {product_id}"),
            thumb: None,
            price,
            qty,
            meta: None,
            added_at: Utc::now(),
        }
    }

    fn products(list: Vec<Product>) -> HashMap<ProductId, Product> {
        list.into_iter().map(|p| (p.id, p)).collect()
    }

    #[test]
    fn test_validate_passes_with_sufficient_stock() {
        let items = vec![
            line(1, "", dec!(20.00), 2),
            line(2, "red-m", dec!(35.00), 1),
        ];
        let map = products(vec![
            product(1, 5, vec![]),
            product(2, 0, vec![variant("red-m", 1)]),
        ]);
        assert!(validate_lines(&items, &map).is_ok());
    }

    #[test]
    fn test_validate_missing_product_is_unavailable() {
        let items = vec![line(9, "", dec!(10.00), 1)];
        assert!(matches!(
            validate_lines(&items, &HashMap::new()),
            Err(CheckoutError::ProductUnavailable { product_id }) if product_id == ProductId::new(9)
        ));
    }

    #[test]
    fn test_validate_inactive_product_is_unavailable() {
        let items = vec![line(1, "", dec!(10.00), 1)];
        let mut p = product(1, 5, vec![]);
        p.is_active = false;
        assert!(matches!(
            validate_lines(&items, &products(vec![p])),
            Err(CheckoutError::ProductUnavailable { .. })
        ));
    }

    #[test]
    fn test_validate_unknown_variant() {
        let items = vec![line(1, "green-s", dec!(10.00), 1)];
        let map = products(vec![product(1, 0, vec![variant("red-m", 3)])]);
        assert!(matches!(
            validate_lines(&items, &map),
            Err(CheckoutError::VariantNotFound { sku, .. }) if sku == "green-s"
        ));
    }

    #[test]
    fn test_validate_sku_against_variantless_product() {
        let items = vec![line(1, "red-m", dec!(10.00), 1)];
        let map = products(vec![product(1, 10, vec![])]);
        assert!(matches!(
            validate_lines(&items, &map),
            Err(CheckoutError::VariantNotFound { .. })
        ));
    }

    #[test]
    fn test_validate_variant_stock_short() {
        let items = vec![line(1, "red-m", dec!(10.00), 2)];
        let map = products(vec![product(1, 10, vec![variant("red-m", 1)])]);
        assert!(matches!(
            validate_lines(&items, &map),
            Err(CheckoutError::InsufficientStock {
                variant_sku: Some(sku),
                requested: 2,
                available: 1,
                ..
            }) if sku == "red-m"
        ));
    }

    #[test]
    fn test_validate_base_stock_ignored_when_variants_exist() {
        // Product has plenty of base stock, but the line selects no variant
        // and variants exist, so there is nothing purchasable behind it.
        let items = vec![line(1, "", dec!(10.00), 1)];
        let map = products(vec![product(1, 99, vec![variant("red-m", 5)])]);
        assert!(matches!(
            validate_lines(&items, &map),
            Err(CheckoutError::InsufficientStock { available: 0, .. })
        ));
    }

    #[test]
    fn test_validate_first_failing_line_wins() {
        // Line 1 is short on stock; line 2 references a missing product.
        // Cart order decides: the stock failure is reported.
        let items = vec![line(1, "", dec!(10.00), 5), line(9, "", dec!(10.00), 1)];
        let map = products(vec![product(1, 2, vec![])]);
        assert!(matches!(
            validate_lines(&items, &map),
            Err(CheckoutError::InsufficientStock { available: 2, .. })
        ));
    }

    #[test]
    fn test_snapshot_items_copies_cart_lines() {
        let items = snapshot_items(&[line(1, "red-m", dec!(12.50), 3)]);
        assert_eq!(items.len(), 1);
        let item = items.first().unwrap();
        assert_eq!(item.variant_sku.as_deref(), Some("red-m"));
        assert_eq!(item.price, dec!(12.50));
        assert_eq!(item.qty, 3);
    }

    #[test]
    fn test_compute_amounts_invariant() {
        let items = snapshot_items(&[
            line(1, "", dec!(20.00), 2),
            line(2, "red-m", dec!(35.00), 1),
        ]);
        let amounts = compute_amounts(&items);
        assert_eq!(amounts.subtotal, dec!(75.00));
        assert_eq!(amounts.shipping, Decimal::ZERO);
        assert_eq!(amounts.total, amounts.subtotal + amounts.shipping);
    }

    #[test]
    fn test_compute_amounts_empty() {
        let amounts = compute_amounts(&[]);
        assert_eq!(amounts.subtotal, Decimal::ZERO);
        assert_eq!(amounts.total, Decimal::ZERO);
    }

    #[test]
    fn test_conflict_detail_shapes() {
        let err = CheckoutError::InsufficientStock {
            product_id: ProductId::new(2),
            variant_sku: Some("red-m".to_string()),
            requested: 1,
            available: 0,
        };
        let detail = err.conflict_detail().unwrap();
        assert_eq!(detail["product"], 2);
        assert_eq!(detail["variantSku"], "red-m");
        assert_eq!(detail["available"], 0);

        assert!(CheckoutError::EmptyCart.conflict_detail().is_none());
    }
}
