//! Configuration and opening of backends.

pub mod config;

pub use config::{BackendKind, DatabaseConfig};

use crate::core::Result;
use crate::executor::Backend;
use crate::memory::MemoryDatabase;
use std::sync::Arc;

/// Open the backend a configuration describes.
///
/// A `postgres://` configuration requires the `postgres` feature; without it
/// the call fails with [`DbError::Config`](crate::DbError::Config).
pub async fn open(config: &DatabaseConfig) -> Result<Arc<dyn Backend>> {
    config.validate()?;

    match config.backend {
        BackendKind::Memory => {
            tracing::debug!(database = %config.database, "opening in-memory database");
            Ok(Arc::new(MemoryDatabase::new()))
        }
        BackendKind::Postgres => open_postgres(config).await,
    }
}

#[cfg(feature = "postgres")]
async fn open_postgres(config: &DatabaseConfig) -> Result<Arc<dyn Backend>> {
    let db = crate::postgres::PgDatabase::connect(config).await?;
    Ok(Arc::new(db))
}

#[cfg(not(feature = "postgres"))]
async fn open_postgres(config: &DatabaseConfig) -> Result<Arc<dyn Backend>> {
    Err(crate::core::DbError::Config(format!(
        "{} requires the 'postgres' feature",
        config.to_url()
    )))
}
