use super::{Shared, into_row_source};
use crate::core::{DbError, Param, Result};
use crate::executor::{CommandResult, Executor, Transaction};
use crate::parser::Statement;
use crate::rows::RowSource;
use crate::storage::Catalog;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

enum TxState {
    Active { base: Catalog, working: Catalog },
    Committed,
    RolledBack,
}

/// Snapshot transaction over a [`MemoryDatabase`](super::MemoryDatabase).
///
/// Reads see the database as of `begin` plus this transaction's own writes.
/// Commit publishes every table this transaction changed, unless one of them
/// was changed by someone else since `begin`; then the commit fails and
/// nothing is published.
pub struct MemoryTransaction {
    id: u64,
    shared: Arc<Shared>,
    state: Mutex<TxState>,
    finished: AtomicBool,
}

impl MemoryTransaction {
    pub(crate) fn new(id: u64, shared: Arc<Shared>, snapshot: Catalog) -> Self {
        Self {
            id,
            shared,
            state: Mutex::new(TxState::Active {
                base: snapshot.clone(),
                working: snapshot,
            }),
            finished: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    async fn run(&self, sql: &str, params: &[Param]) -> Result<super::Outcome> {
        let mut state = self.state.lock().await;
        let working = match &mut *state {
            TxState::Active { working, .. } => working,
            finished => return Err(finished_error(finished)),
        };

        let stmt = self.shared.engine.parse(sql)?;
        tracing::debug!(
            tx = self.id,
            statement = stmt.kind(),
            table = stmt.table_name(),
            params = params.len(),
            "memory: executing in transaction"
        );

        match stmt {
            Statement::Query(_) => self.shared.engine.read(working, &stmt, params),
            _ => self.shared.engine.write(working, &stmt, params),
        }
    }
}

fn finished_error(state: &TxState) -> DbError {
    match state {
        TxState::Committed => DbError::Transaction("transaction has already been committed".into()),
        TxState::RolledBack => DbError::Transaction("transaction has already been rolled back".into()),
        TxState::Active { .. } => DbError::Transaction("transaction is still active".into()),
    }
}

#[async_trait]
impl Executor for MemoryTransaction {
    async fn execute(&self, sql: &str, params: &[Param]) -> Result<CommandResult> {
        let outcome = self.run(sql, params).await?;
        Ok(CommandResult::new(outcome.rows_affected()))
    }

    async fn query(&self, sql: &str, params: &[Param]) -> Result<Box<dyn RowSource>> {
        Ok(into_row_source(self.run(sql, params).await?))
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn commit(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        let (base, working) = match std::mem::replace(&mut *state, TxState::RolledBack) {
            TxState::Active { base, working } => (base, working),
            finished => {
                let err = finished_error(&finished);
                *state = finished;
                return Err(err);
            }
        };
        self.finished.store(true, Ordering::Release);

        let changed: Vec<String> = working
            .table_names()
            .into_iter()
            .filter(|name| working.version_of(name) != base.version_of(name))
            .collect();

        let mut shared = self.shared.catalog.write().await;
        if let Some(conflict) = changed
            .iter()
            .find(|name| shared.version_of(name) != base.version_of(name))
        {
            tracing::warn!(tx = self.id, table = %conflict, "memory: commit conflict, rolled back");
            return Err(DbError::Transaction(format!(
                "could not serialize access: table '{}' was modified concurrently",
                conflict
            )));
        }

        for name in &changed {
            shared.adopt(&working, name);
        }
        *state = TxState::Committed;

        tracing::debug!(tx = self.id, tables = changed.len(), "memory: commit");
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if !matches!(*state, TxState::Active { .. }) {
            return Err(finished_error(&state));
        }

        *state = TxState::RolledBack;
        self.finished.store(true, Ordering::Release);
        tracing::warn!(tx = self.id, "memory: rollback");
        Ok(())
    }

    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use crate::DbError;
    use crate::executor::{Backend, Executor};
    use crate::memory::MemoryDatabase;
    use serde_json::json;

    const CREATE: &str = "CREATE TABLE docs (id TEXT PRIMARY KEY, attrs JSONB)";
    const INSERT: &str = "INSERT INTO docs (id, attrs) VALUES ($1, $2::jsonb)";
    const COUNT: &str = "SELECT count(*) FROM docs";

    async fn count<E: Executor + ?Sized>(exec: &E) -> i64 {
        exec.query_row(COUNT, &[]).await.unwrap().unwrap().decode().unwrap()
    }

    async fn setup() -> MemoryDatabase {
        let db = MemoryDatabase::new();
        db.execute(CREATE, &[]).await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_commit_publishes() {
        let db = setup().await;
        let tx = db.begin().await.unwrap();

        tx.execute(INSERT, &["a".into(), json!({}).into()]).await.unwrap();
        assert_eq!(count(tx.as_ref()).await, 1);
        assert_eq!(count(&db).await, 0);

        tx.commit().await.unwrap();
        assert!(tx.is_finished());
        assert_eq!(count(&db).await, 1);
    }

    #[tokio::test]
    async fn test_rollback_discards() {
        let db = setup().await;
        let tx = db.begin().await.unwrap();
        tx.execute(INSERT, &["a".into(), json!({}).into()]).await.unwrap();
        tx.rollback().await.unwrap();

        assert_eq!(count(&db).await, 0);
        assert!(matches!(
            tx.execute(INSERT, &["b".into(), json!({}).into()]).await,
            Err(DbError::Transaction(_))
        ));
        assert!(matches!(tx.commit().await, Err(DbError::Transaction(_))));
        assert!(matches!(tx.rollback().await, Err(DbError::Transaction(_))));
    }

    #[tokio::test]
    async fn test_snapshot_does_not_see_later_writes() {
        let db = setup().await;
        let tx = db.begin().await.unwrap();
        db.execute(INSERT, &["a".into(), json!({}).into()]).await.unwrap();

        assert_eq!(count(tx.as_ref()).await, 0);
        // read-only transactions never conflict
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_write_conflict() {
        let db = setup().await;
        let first = db.begin().await.unwrap();
        let second = db.begin().await.unwrap();

        first.execute(INSERT, &["a".into(), json!({}).into()]).await.unwrap();
        second.execute(INSERT, &["b".into(), json!({}).into()]).await.unwrap();

        first.commit().await.unwrap();
        assert!(matches!(second.commit().await, Err(DbError::Transaction(_))));
        assert!(second.is_finished());
        assert_eq!(count(&db).await, 1);
    }

    #[tokio::test]
    async fn test_statement_error_keeps_transaction_usable() {
        let db = setup().await;
        let tx = db.begin().await.unwrap();
        tx.execute(INSERT, &["a".into(), json!({}).into()]).await.unwrap();
        assert!(tx.execute(INSERT, &["a".into(), json!({}).into()]).await.is_err());
        tx.execute(INSERT, &["b".into(), json!({}).into()]).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(count(&db).await, 2);
    }
}
