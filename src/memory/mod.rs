//! In-memory backend speaking the same SQL subset the document layer emits.
//!
//! State is a copy-on-write [`Catalog`]. Plain statements apply directly to
//! the shared catalog; a transaction works on its own snapshot and publishes
//! the tables it changed at commit, failing if another writer changed any of
//! them first.

mod engine;
pub mod transaction;

pub use transaction::MemoryTransaction;

use engine::{Engine, Outcome};

use crate::core::{Param, Result};
use crate::executor::{Backend, CommandResult, Executor, TransactionHandle};
use crate::parser::Statement;
use crate::rows::{BufferedRows, RowSource};
use crate::storage::Catalog;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

pub(crate) struct Shared {
    pub(crate) engine: Engine,
    pub(crate) catalog: RwLock<Catalog>,
    next_tx_id: AtomicU64,
}

/// A private in-memory database. Clones share the same data.
#[derive(Clone)]
pub struct MemoryDatabase {
    shared: Arc<Shared>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                engine: Engine::new(),
                catalog: RwLock::new(Catalog::new()),
                next_tx_id: AtomicU64::new(1),
            }),
        }
    }

    /// Names of the tables created so far.
    pub async fn table_names(&self) -> Vec<String> {
        self.shared.catalog.read().await.table_names()
    }

    async fn run(&self, sql: &str, params: &[Param]) -> Result<Outcome> {
        let stmt = self.shared.engine.parse(sql)?;
        tracing::debug!(
            statement = stmt.kind(),
            table = stmt.table_name(),
            params = params.len(),
            "memory: executing"
        );

        if let Statement::Query(_) = stmt {
            let catalog = self.shared.catalog.read().await;
            return self.shared.engine.read(&catalog, &stmt, params);
        }

        let mut catalog = self.shared.catalog.write().await;
        self.shared.engine.write(&mut catalog, &stmt, params)
    }
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDatabase").finish_non_exhaustive()
    }
}

pub(crate) fn into_row_source(outcome: Outcome) -> Box<dyn RowSource> {
    match outcome {
        Outcome::Rows { columns, rows } => Box::new(BufferedRows::new(columns, rows)),
        Outcome::Command(_) => Box::new(BufferedRows::empty()),
    }
}

#[async_trait]
impl Executor for MemoryDatabase {
    async fn execute(&self, sql: &str, params: &[Param]) -> Result<CommandResult> {
        let outcome = self.run(sql, params).await?;
        Ok(CommandResult::new(outcome.rows_affected()))
    }

    async fn query(&self, sql: &str, params: &[Param]) -> Result<Box<dyn RowSource>> {
        Ok(into_row_source(self.run(sql, params).await?))
    }
}

#[async_trait]
impl Backend for MemoryDatabase {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn begin(&self) -> Result<TransactionHandle> {
        let snapshot = self.shared.catalog.read().await.clone();
        let id = self.shared.next_tx_id.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(tx = id, "memory: begin");
        Ok(Arc::new(MemoryTransaction::new(id, self.shared.clone(), snapshot)))
    }
}
