//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;

use crate::config::ApiConfig;
use crate::models::product::HomeSection;

/// How long the home-page aggregation stays cached.
const HOME_CACHE_TTL: Duration = Duration::from_secs(60);

/// Cache for the home-page aggregation, keyed by per-category product limit.
pub type HomeCache = Cache<i64, Arc<Vec<HomeSection>>>;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: PgPool,
    home_cache: HomeCache,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - API configuration
    /// * `pool` - `PostgreSQL` connection pool
    #[must_use]
    pub fn new(config: ApiConfig, pool: PgPool) -> Self {
        let home_cache = Cache::builder()
            .max_capacity(16)
            .time_to_live(HOME_CACHE_TTL)
            .build();

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                home_cache,
            }),
        }
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the home-page aggregation cache.
    #[must_use]
    pub fn home_cache(&self) -> &HomeCache {
        &self.inner.home_cache
    }
}
