//! PostgreSQL storage for the Rifa raffle backend.
//!
//! One [`PgStore`] implements every core storage trait. Slot transitions are
//! conditional updates whose row counts are checked against the requested
//! set, so optimistic-concurrency conflicts surface as
//! [`rifa_core::CoreError::Conflict`] instead of silently partial writes;
//! composite reconciliation transitions run inside a single transaction.

mod rows;

pub mod pool;
pub mod reconcile;
pub mod stores;

use rifa_core::error::{CoreError, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

/// PostgreSQL implementation of the Rifa storage surface.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to `url` with a bounded pool and acquisition timeout.
    ///
    /// The acquisition timeout keeps a saturated pool from hanging callers
    /// indefinitely; timed-out acquisitions surface as storage errors the
    /// HTTP layer maps to a retryable response.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Storage`] if the database is unreachable.
    pub async fn connect(url: &str, max_connections: u32, acquire_timeout: Duration) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await
            .map_err(|e| CoreError::Storage(format!("failed to connect: {e}")))?;
        Ok(Self::new(pool))
    }

    /// Run embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Storage`] if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| CoreError::Storage(format!("migration failed: {e}")))?;
        Ok(())
    }

    /// Access the underlying pool (health checks, ad-hoc queries in tests).
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Map a sqlx error to the storage variant of the core taxonomy.
pub(crate) fn storage_err(context: &str, err: &sqlx::Error) -> CoreError {
    CoreError::Storage(format!("{context}: {err}"))
}
