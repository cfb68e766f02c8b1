//! JSONB semantics over `serde_json::Value`
//!
//! The in-memory engine stores document attributes as plain JSON values and
//! needs the same answers PostgreSQL gives for its `jsonb` type.
//!
//! # Architecture
//!
//! - `containment.rs` - the `@>` operator
//! - `ordering.rs` - jsonb equality and the total order used by `ORDER BY`

mod containment;
mod ordering;

pub use containment::contains;
pub use ordering::{compare, equal};
