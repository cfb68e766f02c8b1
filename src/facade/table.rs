use super::document::{Document, encode};
use crate::core::{DbError, Param, PkType, Result};
use crate::executor::{Backend, CommandResult, Context, TransactionHandle, current_transaction};
use crate::filter::{Filter, QueryModifier};
use crate::rows::{Destination, Row, RowSource, collect_rows, decode_rows};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// Where a single operation runs: the ambient transaction or the backend.
enum Target {
    Transaction(TransactionHandle),
    Default(Arc<dyn Backend>),
}

impl Target {
    async fn execute(&self, sql: &str, params: &[Param]) -> Result<CommandResult> {
        match self {
            Self::Transaction(tx) => tx.execute(sql, params).await,
            Self::Default(backend) => backend.execute(sql, params).await,
        }
    }

    async fn query(&self, sql: &str, params: &[Param]) -> Result<Box<dyn RowSource>> {
        match self {
            Self::Transaction(tx) => tx.query(sql, params).await,
            Self::Default(backend) => backend.query(sql, params).await,
        }
    }

    async fn query_row(&self, sql: &str, params: &[Param]) -> Result<Option<Row>> {
        match self {
            Self::Transaction(tx) => tx.query_row(sql, params).await,
            Self::Default(backend) => backend.query_row(sql, params).await,
        }
    }
}

/// A document collection backed by one `(id, attrs, updated_at)` table.
///
/// Every operation takes the call's [`Context`]; when it carries a
/// transaction the operation joins it, otherwise it runs on the backend.
#[derive(Clone)]
pub struct Table {
    name: String,
    pk_type: PkType,
    backend: Arc<dyn Backend>,
}

impl Table {
    pub(crate) fn new(name: &str, pk_type: PkType, backend: Arc<dyn Backend>) -> Self {
        Self {
            name: name.to_string(),
            pk_type,
            backend,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pk_type(&self) -> PkType {
        self.pk_type
    }

    /// Use a different identifier column type for `create`.
    pub fn with_pk_type(mut self, pk_type: PkType) -> Self {
        self.pk_type = pk_type;
        self
    }

    fn target(&self, ctx: &Context) -> Target {
        match current_transaction(ctx) {
            Some(tx) => Target::Transaction(tx),
            None => Target::Default(self.backend.clone()),
        }
    }

    /// Create the table if it does not already exist.
    pub async fn create(&self, ctx: &Context) -> Result<CommandResult> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (id {} PRIMARY KEY, attrs JSONB, updated_at TIMESTAMPTZ)",
            self.name, self.pk_type
        );
        self.target(ctx).execute(&sql, &[]).await
    }

    pub async fn insert_by_id<T: Serialize + ?Sized>(
        &self,
        ctx: &Context,
        id: &str,
        doc: &T,
    ) -> Result<CommandResult> {
        let sql = format!(
            "INSERT INTO {} (id, attrs, updated_at) VALUES ($1, $2::jsonb, $3)",
            self.name
        );
        let params = [
            Param::Text(id.to_string()),
            Param::Json(encode(doc)?),
            Param::Timestamp(Utc::now()),
        ];
        self.target(ctx).execute(&sql, &params).await
    }

    /// Insert several documents in one statement. Documents without an
    /// `updated_at` are stamped with the current time.
    pub async fn insert_many(&self, ctx: &Context, docs: &[Document]) -> Result<CommandResult> {
        if docs.is_empty() {
            return Ok(CommandResult::default());
        }

        let now = Utc::now();
        let mut params = Vec::with_capacity(docs.len() * 3);
        let mut tuples = Vec::with_capacity(docs.len());
        for doc in docs {
            let base = params.len();
            params.push(Param::Text(doc.id.clone()));
            params.push(Param::Json(doc.attrs.clone()));
            params.push(Param::Timestamp(doc.updated_at.unwrap_or(now)));
            tuples.push(format!("(${}, ${}::jsonb, ${})", base + 1, base + 2, base + 3));
        }

        let sql = format!(
            "INSERT INTO {} (id, attrs, updated_at) VALUES {}",
            self.name,
            tuples.join(", ")
        );
        self.target(ctx).execute(&sql, &params).await
    }

    /// Decode the document stored under `id`, if there is one.
    pub async fn find_by_id<T: DeserializeOwned>(&self, ctx: &Context, id: &str) -> Result<Option<T>> {
        let sql = format!("SELECT attrs FROM {} WHERE id = $1", self.name);
        let row = self
            .target(ctx)
            .query_row(&sql, &[Param::Text(id.to_string())])
            .await?;
        row.map(|row| row.decode::<T>()).transpose()
    }

    /// Rows of `attrs` matching `filter`, with `modifiers` applied in order.
    pub async fn find(
        &self,
        ctx: &Context,
        filter: &Filter,
        modifiers: &[QueryModifier],
    ) -> Result<Box<dyn RowSource>> {
        let predicate = filter.compile()?.modify(modifiers);
        let sql = format!("SELECT attrs FROM {}{}", self.name, predicate.render());
        self.target(ctx).query(&sql, predicate.params()).await
    }

    pub async fn find_all<T: DeserializeOwned>(
        &self,
        ctx: &Context,
        filter: &Filter,
        modifiers: &[QueryModifier],
    ) -> Result<Vec<T>> {
        let rows = self.find(ctx, filter, modifiers).await?;
        collect_rows(rows)
    }

    /// Decode matching documents into a caller-owned container.
    pub async fn find_into<D: Destination + ?Sized>(
        &self,
        ctx: &Context,
        filter: &Filter,
        modifiers: &[QueryModifier],
        destination: &mut D,
    ) -> Result<usize> {
        let rows = self.find(ctx, filter, modifiers).await?;
        decode_rows(rows, destination)
    }

    /// Matching documents with their identifiers and timestamps.
    pub async fn find_documents(
        &self,
        ctx: &Context,
        filter: &Filter,
        modifiers: &[QueryModifier],
    ) -> Result<Vec<Document>> {
        let predicate = filter.compile()?.modify(modifiers);
        let sql = format!(
            "SELECT id, attrs, updated_at FROM {}{}",
            self.name,
            predicate.render()
        );
        let rows = self.target(ctx).query(&sql, predicate.params()).await?;
        let tuples: Vec<(String, Value, Option<DateTime<Utc>>)> = collect_rows(rows)?;
        Ok(tuples
            .into_iter()
            .map(|(id, attrs, updated_at)| Document {
                id,
                attrs,
                updated_at,
            })
            .collect())
    }

    /// Replace the whole document stored under `id`.
    pub async fn update_by_id<T: Serialize + ?Sized>(
        &self,
        ctx: &Context,
        id: &str,
        doc: &T,
    ) -> Result<CommandResult> {
        let sql = format!(
            "UPDATE {} SET attrs = $2::jsonb, updated_at = $3 WHERE id = $1",
            self.name
        );
        let params = [
            Param::Text(id.to_string()),
            Param::Json(encode(doc)?),
            Param::Timestamp(Utc::now()),
        ];
        self.target(ctx).execute(&sql, &params).await
    }

    pub async fn delete_by_id(&self, ctx: &Context, id: &str) -> Result<CommandResult> {
        let sql = format!("DELETE FROM {} WHERE id = $1", self.name);
        self.target(ctx)
            .execute(&sql, &[Param::Text(id.to_string())])
            .await
    }

    /// Delete every matching document; the empty filter deletes all of them.
    pub async fn delete_many(&self, ctx: &Context, filter: &Filter) -> Result<CommandResult> {
        let predicate = filter.compile()?;
        let sql = format!("DELETE FROM {}{}", self.name, predicate.where_clause());
        self.target(ctx).execute(&sql, predicate.params()).await
    }

    pub async fn count_documents(&self, ctx: &Context, filter: &Filter) -> Result<u64> {
        let predicate = filter.compile()?;
        let sql = format!("SELECT count(*) FROM {}{}", self.name, predicate.where_clause());
        let row = self
            .target(ctx)
            .query_row(&sql, predicate.params())
            .await?
            .ok_or_else(|| DbError::Execution("count(*) returned no row".into()))?;
        let count: i64 = row.decode()?;
        u64::try_from(count).map_err(|_| DbError::Decode(format!("negative count {}", count)))
    }
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.name)
            .field("pk_type", &self.pk_type)
            .field("backend", &self.backend.name())
            .finish()
    }
}
