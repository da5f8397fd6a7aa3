//! Category repository. Read-only from the storefront's perspective.

use sqlx::PgPool;

use super::RepositoryError;
use crate::models::category::Category;

const CATEGORY_COLUMNS: &str =
    "id, name, description, image_url, is_active, subcategories, created_at, updated_at";

/// Repository for category reads.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    /// Create a new category repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All active categories, alphabetical.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(&self) -> Result<Vec<Category>, RepositoryError> {
        let categories = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM category WHERE is_active = TRUE ORDER BY name"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(categories)
    }
}
