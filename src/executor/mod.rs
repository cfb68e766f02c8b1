//! Execution targets: the seam between the document layer and an engine.
//!
//! A [`Backend`] is the default, shared target (a pool or an in-memory
//! engine). A [`Transaction`] is a target bound to one unit of work; it is
//! begun by the caller, carried in a [`Context`](context::Context), and
//! finished by the caller.

pub mod context;

pub use context::{Context, TRANSACTION_KEY, current_transaction, with_transaction};

use crate::core::{Param, Result};
use crate::rows::{Row, RowSource};
use async_trait::async_trait;
use std::sync::Arc;

/// Outcome of a statement that returns no rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandResult {
    rows_affected: u64,
}

impl CommandResult {
    pub fn new(rows_affected: u64) -> Self {
        Self { rows_affected }
    }

    pub fn rows_affected(&self) -> u64 {
        self.rows_affected
    }
}

/// Runs parameterized SQL. `$n` placeholders refer to `params[n - 1]`.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, sql: &str, params: &[Param]) -> Result<CommandResult>;

    async fn query(&self, sql: &str, params: &[Param]) -> Result<Box<dyn RowSource>>;

    /// First row of a query, if any. The row source is released either way.
    async fn query_row(&self, sql: &str, params: &[Param]) -> Result<Option<Row>> {
        let mut rows = self.query(sql, params).await?;
        let first = match rows.advance() {
            Ok(true) => rows.row().cloned().map(Some),
            Ok(false) => Ok(None),
            Err(e) => Err(e),
        };
        rows.close();
        first
    }
}

/// An in-flight unit of work.
///
/// Both `commit` and `rollback` finish the transaction; any later call on it
/// fails with [`DbError::Transaction`](crate::DbError::Transaction).
#[async_trait]
pub trait Transaction: Executor {
    async fn commit(&self) -> Result<()>;

    async fn rollback(&self) -> Result<()>;

    fn is_finished(&self) -> bool;
}

pub type TransactionHandle = Arc<dyn Transaction>;

/// The default execution target, able to start transactions.
#[async_trait]
pub trait Backend: Executor {
    fn name(&self) -> &'static str;

    async fn begin(&self) -> Result<TransactionHandle>;
}
