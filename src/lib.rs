// ============================================================================
// jsonbdb Library
// ============================================================================

//! A document store over a relational `(id, attrs JSONB, updated_at)` table.
//!
//! Documents are filtered with declarative [`Filter`]s that compile to
//! parameterized predicates, read back through a row materializer, and
//! written either directly or inside a caller-owned transaction carried by
//! a [`Context`].
//!
//! Two backends ship with the crate: an in-memory SQL engine
//! ([`MemoryDatabase`]) and, behind the `postgres` feature, PostgreSQL.

pub mod connection;
pub mod core;
pub mod executor;
pub mod facade;
pub mod filter;
pub mod json;
pub mod memory;
pub mod plugins;
pub mod rows;

mod evaluator;
mod parser;
mod storage;

#[cfg(feature = "postgres")]
pub mod postgres;

// Re-export main types for convenience
pub use connection::{BackendKind, DatabaseConfig};
pub use core::{DbError, Param, PkType, Result};
pub use executor::{
    Backend, CommandResult, Context, Executor, TRANSACTION_KEY, Transaction, TransactionHandle,
    current_transaction, with_transaction,
};
pub use facade::{Database, Document, Table};
pub use filter::{Constraint, Filter, Predicate, QueryModifier, limit, offset, order_by, order_by_desc};
pub use memory::MemoryDatabase;
pub use rows::{BufferedRows, Decoded, Destination, Row, RowSource, collect_rows, decode_rows};
