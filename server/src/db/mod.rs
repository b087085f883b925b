// server/src/db/mod.rs

//! Postgres implementations of the store ports. One `PgStore` serves orders,
//! products and OTP records from the same pool.

mod orders;
mod otps;
mod products;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use storefront_core::CommerceError;
use tracing::{error, info, instrument};

#[derive(Debug, Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  #[instrument(name = "db::connect", skip(database_url), err(Display))]
  pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
    let pool = PgPoolOptions::new().max_connections(10).connect(database_url).await?;
    info!("Successfully connected to the database.");
    Ok(Self::new(pool))
  }

  pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(&self.pool).await?;
    info!("Database migrations applied.");
    Ok(())
  }

  pub fn pool(&self) -> &PgPool {
    &self.pool
  }
}

/// Maps a driver error into the domain error, logging the detail.
pub(crate) fn store_err(op: &'static str) -> impl FnOnce(sqlx::Error) -> CommerceError {
  move |e| {
    error!(operation = op, error = %e, "Database operation failed.");
    CommerceError::store(format!("{} failed: {}", op, e))
  }
}
