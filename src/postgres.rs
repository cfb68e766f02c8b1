//! PostgreSQL backend over `tokio-postgres`.
//!
//! Statements are prepared so each [`Param`] can be converted to the type
//! the server inferred for its placeholder: a text identifier bound to a
//! `UUID` column is sent as a UUID, an integer bound to an `INT4` as an
//! `i32`, and so on. Each transaction gets its own connection, which is
//! released when the transaction handle is dropped.

use crate::connection::DatabaseConfig;
use crate::core::{DbError, Param, Result};
use crate::executor::{Backend, CommandResult, Executor, Transaction, TransactionHandle};
use crate::rows::{BufferedRows, Row, RowSource};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio_postgres::types::{Json, ToSql, Type};
use tokio_postgres::{Client, NoTls};

type BoxedParam = Box<dyn ToSql + Sync + Send>;

pub struct PgDatabase {
    client: Client,
    config: tokio_postgres::Config,
    next_tx_id: AtomicU64,
}

impl PgDatabase {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pg = pg_config(config);
        let client = open_client(&pg).await?;
        tracing::debug!(url = %config.to_url(), "postgres: connected");

        Ok(Self {
            client,
            config: pg,
            next_tx_id: AtomicU64::new(1),
        })
    }
}

fn pg_config(config: &DatabaseConfig) -> tokio_postgres::Config {
    let mut pg = tokio_postgres::Config::new();
    pg.host(&config.host)
        .port(config.port)
        .dbname(&config.database)
        .user(&config.username)
        .password(&config.password)
        .connect_timeout(config.connect_timeout);
    if let Some(name) = &config.application_name {
        pg.application_name(name);
    }
    pg
}

async fn open_client(config: &tokio_postgres::Config) -> Result<Client> {
    let (client, connection) = config.connect(NoTls).await?;
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!(error = %e, "postgres: connection error");
        }
    });
    Ok(client)
}

async fn run_execute(client: &Client, sql: &str, params: &[Param]) -> Result<CommandResult> {
    tracing::debug!(sql, params = params.len(), "postgres: executing");
    let stmt = client.prepare(sql).await?;
    let bound = bind(params, stmt.params())?;
    let refs: Vec<&(dyn ToSql + Sync)> = bound.iter().map(|p| &**p as &(dyn ToSql + Sync)).collect();
    let affected = client.execute(&stmt, &refs).await?;
    Ok(CommandResult::new(affected))
}

async fn run_query(client: &Client, sql: &str, params: &[Param]) -> Result<Box<dyn RowSource>> {
    tracing::debug!(sql, params = params.len(), "postgres: querying");
    let stmt = client.prepare(sql).await?;
    let bound = bind(params, stmt.params())?;
    let refs: Vec<&(dyn ToSql + Sync)> = bound.iter().map(|p| &**p as &(dyn ToSql + Sync)).collect();
    let pg_rows = client.query(&stmt, &refs).await?;

    let columns = stmt.columns().iter().map(|c| c.name().to_string()).collect();
    let rows = pg_rows
        .iter()
        .map(|row| {
            (0..row.len())
                .map(|idx| column_value(row, idx))
                .collect::<Result<Vec<_>>>()
                .map(Row::new)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Box::new(BufferedRows::new(columns, rows)))
}

fn bind(params: &[Param], types: &[Type]) -> Result<Vec<BoxedParam>> {
    if params.len() != types.len() {
        return Err(DbError::Execution(format!(
            "statement expects {} parameters, {} bound",
            types.len(),
            params.len()
        )));
    }
    params.iter().zip(types).map(|(p, ty)| to_sql(p, ty)).collect()
}

fn to_sql(param: &Param, ty: &Type) -> Result<BoxedParam> {
    let mismatch = || DbError::TypeMismatch(format!("cannot bind {} as {}", param, ty));

    let boxed: BoxedParam = match param {
        Param::Text(s) if *ty == Type::UUID => {
            Box::new(uuid::Uuid::parse_str(s).map_err(|_| mismatch())?)
        }
        Param::Text(s) if *ty == Type::JSON || *ty == Type::JSONB => {
            Box::new(Json(serde_json::from_str::<Value>(s).map_err(|_| mismatch())?))
        }
        Param::Text(s) => Box::new(s.clone()),
        Param::Json(v) => Box::new(Json(v.clone())),
        Param::Int(i) if *ty == Type::INT4 => Box::new(i32::try_from(*i).map_err(|_| mismatch())?),
        Param::Int(i) if *ty == Type::INT2 => Box::new(i16::try_from(*i).map_err(|_| mismatch())?),
        Param::Int(i) => Box::new(*i),
        Param::Timestamp(ts) if *ty == Type::TIMESTAMP => Box::new(ts.naive_utc()),
        Param::Timestamp(ts) => Box::new(*ts),
    };
    Ok(boxed)
}

/// Column value in the JSON form rows carry.
fn column_value(row: &tokio_postgres::Row, idx: usize) -> Result<Value> {
    let ty = row.columns()[idx].type_();

    let value = if *ty == Type::JSON || *ty == Type::JSONB {
        row.try_get::<_, Option<Json<Value>>>(idx)?.map(|json| json.0)
    } else if *ty == Type::INT8 {
        row.try_get::<_, Option<i64>>(idx)?.map(Value::from)
    } else if *ty == Type::INT4 {
        row.try_get::<_, Option<i32>>(idx)?.map(Value::from)
    } else if *ty == Type::INT2 {
        row.try_get::<_, Option<i16>>(idx)?.map(Value::from)
    } else if *ty == Type::BOOL {
        row.try_get::<_, Option<bool>>(idx)?.map(Value::from)
    } else if *ty == Type::FLOAT8 {
        row.try_get::<_, Option<f64>>(idx)?.map(Value::from)
    } else if *ty == Type::FLOAT4 {
        row.try_get::<_, Option<f32>>(idx)?.map(|f| Value::from(f64::from(f)))
    } else if *ty == Type::UUID {
        row.try_get::<_, Option<uuid::Uuid>>(idx)?
            .map(|id| Value::String(id.to_string()))
    } else if *ty == Type::TIMESTAMPTZ {
        row.try_get::<_, Option<DateTime<Utc>>>(idx)?
            .map(|ts| Value::String(ts.to_rfc3339()))
    } else if *ty == Type::TIMESTAMP {
        row.try_get::<_, Option<NaiveDateTime>>(idx)?
            .map(|ts| Value::String(ts.and_utc().to_rfc3339()))
    } else {
        row.try_get::<_, Option<String>>(idx)?.map(Value::String)
    };

    Ok(value.unwrap_or(Value::Null))
}

#[async_trait]
impl Executor for PgDatabase {
    async fn execute(&self, sql: &str, params: &[Param]) -> Result<CommandResult> {
        run_execute(&self.client, sql, params).await
    }

    async fn query(&self, sql: &str, params: &[Param]) -> Result<Box<dyn RowSource>> {
        run_query(&self.client, sql, params).await
    }
}

#[async_trait]
impl Backend for PgDatabase {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn begin(&self) -> Result<TransactionHandle> {
        let client = open_client(&self.config).await?;
        client.batch_execute("BEGIN").await?;

        let id = self.next_tx_id.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(tx = id, "postgres: begin");
        Ok(Arc::new(PgTransaction {
            id,
            client,
            finished: AtomicBool::new(false),
        }))
    }
}

/// A transaction on its own connection.
pub struct PgTransaction {
    id: u64,
    client: Client,
    finished: AtomicBool,
}

impl PgTransaction {
    fn ensure_active(&self) -> Result<()> {
        if self.finished.load(Ordering::Acquire) {
            return Err(DbError::Transaction("transaction is already finished".into()));
        }
        Ok(())
    }

    fn finish(&self) -> Result<()> {
        if self.finished.swap(true, Ordering::AcqRel) {
            return Err(DbError::Transaction("transaction is already finished".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Executor for PgTransaction {
    async fn execute(&self, sql: &str, params: &[Param]) -> Result<CommandResult> {
        self.ensure_active()?;
        run_execute(&self.client, sql, params).await
    }

    async fn query(&self, sql: &str, params: &[Param]) -> Result<Box<dyn RowSource>> {
        self.ensure_active()?;
        run_query(&self.client, sql, params).await
    }
}

#[async_trait]
impl Transaction for PgTransaction {
    async fn commit(&self) -> Result<()> {
        self.finish()?;
        self.client.batch_execute("COMMIT").await?;
        tracing::debug!(tx = self.id, "postgres: commit");
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        self.finish()?;
        self.client.batch_execute("ROLLBACK").await?;
        tracing::warn!(tx = self.id, "postgres: rollback");
        Ok(())
    }

    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }
}
