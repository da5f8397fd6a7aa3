//! Order repository.
//!
//! Order creation runs on a borrowed transaction connection so checkout can
//! commit the stock decrements, the order insert, and the cart clear as one
//! unit.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};

use tamarind_core::{OrderId, OrderStatus, ProductId, UserId};

use super::RepositoryError;
use crate::models::order::{Order, OrderAmounts, OrderItem, ShippingAddress};

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    subtotal: Decimal,
    shipping: Decimal,
    total: Decimal,
    shipping_address: Json<ShippingAddress>,
    status: OrderStatus,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    order_id: OrderId,
    product_id: ProductId,
    variant_sku: String,
    title: String,
    price: Decimal,
    qty: i32,
    thumb: Option<String>,
}

impl OrderItemRow {
    fn into_item(self) -> OrderItem {
        OrderItem {
            product_id: self.product_id,
            variant_sku: if self.variant_sku.is_empty() {
                None
            } else {
                Some(self.variant_sku)
            },
            title: self.title,
            price: self.price,
            qty: self.qty,
            thumb: self.thumb,
        }
    }
}

/// Repository for order reads and creation.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new order with its item snapshots on a transaction
    /// connection. Status starts as `created`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if an insert fails.
    pub async fn create(
        conn: &mut PgConnection,
        user_id: UserId,
        items: Vec<OrderItem>,
        amounts: OrderAmounts,
        shipping_address: ShippingAddress,
    ) -> Result<Order, RepositoryError> {
        let (order_id, created_at) = sqlx::query_as::<_, (OrderId, DateTime<Utc>)>(
            "INSERT INTO store_order (user_id, subtotal, shipping, total, shipping_address) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, created_at",
        )
        .bind(user_id.as_i32())
        .bind(amounts.subtotal)
        .bind(amounts.shipping)
        .bind(amounts.total)
        .bind(Json(&shipping_address))
        .fetch_one(&mut *conn)
        .await?;

        for item in &items {
            sqlx::query(
                "INSERT INTO order_item \
                     (order_id, product_id, variant_sku, title, price, qty, thumb) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(order_id.as_i32())
            .bind(item.product_id.as_i32())
            .bind(item.variant_sku.as_deref().unwrap_or(""))
            .bind(&item.title)
            .bind(item.price)
            .bind(item.qty)
            .bind(&item.thumb)
            .execute(&mut *conn)
            .await?;
        }

        Ok(Order {
            id: order_id,
            user_id,
            items,
            amounts,
            shipping_address,
            status: OrderStatus::Created,
            created_at,
        })
    }

    /// All orders for a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            "SELECT id, user_id, subtotal, shipping, total, shipping_address, status, created_at \
             FROM store_order WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id.as_i32())
        .fetch_all(self.pool)
        .await?;

        self.assemble(rows).await
    }

    /// One order by ID, scoped to its owner. Returns `None` for orders that
    /// do not exist or belong to another user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_for_user(
        &self,
        order_id: OrderId,
        user_id: UserId,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            "SELECT id, user_id, subtotal, shipping, total, shipping_address, status, created_at \
             FROM store_order WHERE id = $1 AND user_id = $2",
        )
        .bind(order_id.as_i32())
        .bind(user_id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.assemble(vec![row]).await?.into_iter().next()),
            None => Ok(None),
        }
    }

    /// Attach item snapshots to a batch of order rows.
    async fn assemble(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, RepositoryError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i32> = rows.iter().map(|r| r.id.as_i32()).collect();

        let item_rows = sqlx::query_as::<_, OrderItemRow>(
            "SELECT order_id, product_id, variant_sku, title, price, qty, thumb \
             FROM order_item WHERE order_id = ANY($1) ORDER BY id",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let mut items_by_order: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for row in item_rows {
            let order_id = row.order_id;
            items_by_order
                .entry(order_id)
                .or_default()
                .push(row.into_item());
        }

        Ok(rows
            .into_iter()
            .map(|row| Order {
                id: row.id,
                user_id: row.user_id,
                items: items_by_order.remove(&row.id).unwrap_or_default(),
                amounts: OrderAmounts {
                    subtotal: row.subtotal,
                    shipping: row.shipping,
                    total: row.total,
                },
                shipping_address: row.shipping_address.0,
                status: row.status,
                created_at: row.created_at,
            })
            .collect())
    }
}
