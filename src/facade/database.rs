use super::Table;
use crate::connection::{self, DatabaseConfig};
use crate::core::{Result, validate_identifier};
use crate::executor::{Backend, TransactionHandle};
use crate::memory::MemoryDatabase;
use std::sync::Arc;

/// Entry point: a backend plus the configuration it was opened with.
///
/// # Examples
///
/// ```
/// use jsonbdb::{Context, Database, Filter};
/// use serde_json::json;
///
/// # #[tokio::main]
/// # async fn main() -> jsonbdb::Result<()> {
/// let db = Database::memory();
/// let users = db.table("users")?;
/// let ctx = Context::background();
///
/// users.create(&ctx).await?;
/// users.insert_by_id(&ctx, &Database::new_id(), &json!({"name": "Alice"})).await?;
///
/// let found: Vec<serde_json::Value> = users
///     .find_all(&ctx, &Filter::new().with("name", "Alice"), &[])
///     .await?;
/// assert_eq!(found.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Database {
    backend: Arc<dyn Backend>,
    config: DatabaseConfig,
}

impl Database {
    /// Open the backend described by `config`.
    pub async fn connect(config: DatabaseConfig) -> Result<Self> {
        let backend = connection::open(&config).await?;
        Ok(Self { backend, config })
    }

    /// Parse a connection URL and open it.
    pub async fn connect_url(url: &str) -> Result<Self> {
        Self::connect(DatabaseConfig::from_url(url)?).await
    }

    /// A fresh, private in-memory database.
    pub fn memory() -> Self {
        Self {
            backend: Arc::new(MemoryDatabase::new()),
            config: DatabaseConfig::memory("memory"),
        }
    }

    /// Wrap an existing backend.
    pub fn with_backend(backend: Arc<dyn Backend>, config: DatabaseConfig) -> Self {
        Self { backend, config }
    }

    /// Handle to the document table `name`. The name must be a plain SQL
    /// identifier because it is the one piece of caller text placed
    /// directly into statements.
    pub fn table(&self, name: &str) -> Result<Table> {
        validate_identifier(name)?;
        Ok(Table::new(name, self.config.primary_key, self.backend.clone()))
    }

    /// Start a transaction. The caller owns it: bind it to a context with
    /// [`with_transaction`](crate::with_transaction), then commit or roll back.
    pub async fn begin(&self) -> Result<TransactionHandle> {
        self.backend.begin().await
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// A new UUID v4 identifier.
    pub fn new_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("backend", &self.backend.name())
            .field("url", &self.config.to_url())
            .finish()
    }
}
