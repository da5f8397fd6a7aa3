//! Cart repository.
//!
//! The merge-by-key invariant (at most one line per (product, variant sku))
//! is enforced by a uniqueness constraint, and additions go through a single
//! `INSERT .. ON CONFLICT .. DO UPDATE` so two concurrent adds for the same
//! key both land as increments instead of one overwriting the other.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};

use tamarind_core::{CartId, ProductId, UserId};

use super::RepositoryError;
use crate::models::cart::{Cart, CartItem};

/// Input for adding a line to a cart. Snapshot fields are captured by the
/// caller from the live product at add time.
#[derive(Debug, Clone)]
pub struct NewCartItem {
    pub product_id: ProductId,
    /// Empty string for variant-less lines.
    pub variant_sku: String,
    pub title: String,
    pub thumb: Option<String>,
    pub price: Decimal,
    pub qty: i32,
    pub meta: Option<BTreeMap<String, String>>,
}

#[derive(sqlx::FromRow)]
struct CartRow {
    id: CartId,
    user_id: UserId,
    updated_at: DateTime<Utc>,
}

/// Repository for cart operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user's cart with its items, or `None` if no cart exists yet.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_by_user(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        let row = self.fetch_row(user_id).await?;
        match row {
            Some(row) => Ok(Some(self.load_items(row).await?)),
            None => Ok(None),
        }
    }

    /// Add a line to the user's cart, creating the cart lazily.
    ///
    /// If a line with the same (product, variant sku) key exists, its
    /// quantity is incremented and the existing snapshot is kept; otherwise a
    /// new line is appended. Returns the updated cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn add_item(
        &self,
        user_id: UserId,
        item: NewCartItem,
    ) -> Result<Cart, RepositoryError> {
        sqlx::query("INSERT INTO cart (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
            .bind(user_id.as_i32())
            .execute(self.pool)
            .await?;

        let row = self
            .fetch_row(user_id)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        // Atomic merge: the increment happens in the database, not via
        // read-modify-write in the handler.
        sqlx::query(
            "INSERT INTO cart_item \
                 (cart_id, product_id, variant_sku, title, thumb, price, qty, meta) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (cart_id, product_id, variant_sku) \
             DO UPDATE SET qty = cart_item.qty + EXCLUDED.qty",
        )
        .bind(row.id.as_i32())
        .bind(item.product_id.as_i32())
        .bind(&item.variant_sku)
        .bind(&item.title)
        .bind(&item.thumb)
        .bind(item.price)
        .bind(item.qty)
        .bind(item.meta.map(Json))
        .execute(self.pool)
        .await?;

        self.touch(row.id).await?;

        let row = self
            .fetch_row(user_id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        self.load_items(row).await
    }

    /// Remove the line matching (product, variant sku) from the user's cart.
    ///
    /// Removing a line that does not exist is a no-op; a user without a cart
    /// is an error.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user has no cart.
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn remove_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        variant_sku: Option<&str>,
    ) -> Result<Cart, RepositoryError> {
        let row = self
            .fetch_row(user_id)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        sqlx::query(
            "DELETE FROM cart_item \
             WHERE cart_id = $1 AND product_id = $2 AND variant_sku = $3",
        )
        .bind(row.id.as_i32())
        .bind(product_id.as_i32())
        .bind(variant_sku.unwrap_or(""))
        .execute(self.pool)
        .await?;

        self.touch(row.id).await?;
        self.load_items(row).await
    }

    /// Empty a cart's lines inside a checkout transaction. The cart row
    /// itself is kept.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn clear(conn: &mut PgConnection, cart_id: CartId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM cart_item WHERE cart_id = $1")
            .bind(cart_id.as_i32())
            .execute(&mut *conn)
            .await?;

        sqlx::query("UPDATE cart SET updated_at = now() WHERE id = $1")
            .bind(cart_id.as_i32())
            .execute(&mut *conn)
            .await?;

        Ok(())
    }

    async fn fetch_row(&self, user_id: UserId) -> Result<Option<CartRow>, RepositoryError> {
        let row =
            sqlx::query_as::<_, CartRow>("SELECT id, user_id, updated_at FROM cart WHERE user_id = $1")
                .bind(user_id.as_i32())
                .fetch_optional(self.pool)
                .await?;
        Ok(row)
    }

    async fn touch(&self, cart_id: CartId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE cart SET updated_at = now() WHERE id = $1")
            .bind(cart_id.as_i32())
            .execute(self.pool)
            .await?;
        Ok(())
    }

    async fn load_items(&self, row: CartRow) -> Result<Cart, RepositoryError> {
        let items = sqlx::query_as::<_, CartItem>(
            "SELECT product_id, variant_sku, title, thumb, price, qty, meta, added_at \
             FROM cart_item WHERE cart_id = $1 ORDER BY added_at, id",
        )
        .bind(row.id.as_i32())
        .fetch_all(self.pool)
        .await?;

        Ok(Cart {
            id: row.id,
            user_id: row.user_id,
            items,
            updated_at: row.updated_at,
        })
    }
}
