//! Result rows and their materialization into typed collections.

pub mod buffered;
pub mod materializer;

pub use buffered::BufferedRows;
pub use materializer::{Decoded, Destination, collect_rows, decode_rows};

use crate::core::{DbError, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// One result row. Column values are carried in their JSON form, which is
/// also the form documents are stored in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Decode the row into `T`.
    ///
    /// A single-column row decodes from that column; a wider row decodes
    /// from the sequence of its columns, so tuples line up with the
    /// projection.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        let decoded = match self.values.as_slice() {
            [] => return Err(DbError::Decode("row has no columns".into())),
            [single] => T::deserialize(single),
            _ => T::deserialize(Value::Array(self.values.clone())),
        };
        decoded.map_err(|e| DbError::Decode(e.to_string()))
    }
}

impl From<Vec<Value>> for Row {
    fn from(values: Vec<Value>) -> Self {
        Self::new(values)
    }
}

/// Forward-only, single-consumer cursor over result rows.
///
/// `advance` moves to the next row and reports whether there was one;
/// `row` exposes the current row; `close` releases whatever the source
/// holds. After `close`, `advance` reports the end.
pub trait RowSource: Send {
    fn columns(&self) -> &[String];

    fn advance(&mut self) -> Result<bool>;

    fn row(&self) -> Result<&Row>;

    fn close(&mut self);

    fn is_closed(&self) -> bool;
}

impl<S: RowSource + ?Sized> RowSource for Box<S> {
    fn columns(&self) -> &[String] {
        (**self).columns()
    }

    fn advance(&mut self) -> Result<bool> {
        (**self).advance()
    }

    fn row(&self) -> Result<&Row> {
        (**self).row()
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn is_closed(&self) -> bool {
        (**self).is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Doc {
        name: String,
        age: u32,
    }

    #[test]
    fn test_single_column_decodes_the_column() {
        let row = Row::new(vec![json!({"name": "tester1", "age": 10})]);
        let doc: Doc = row.decode().unwrap();
        assert_eq!(doc, Doc { name: "tester1".into(), age: 10 });
    }

    #[test]
    fn test_wide_row_decodes_as_tuple() {
        let row = Row::new(vec![json!("id-1"), json!({"name": "a", "age": 1})]);
        let (id, doc): (String, Doc) = row.decode().unwrap();
        assert_eq!(id, "id-1");
        assert_eq!(doc.age, 1);
    }

    #[test]
    fn test_shape_mismatch_is_decode_error() {
        let row = Row::new(vec![json!({"name": 5})]);
        let err = row.decode::<Doc>().unwrap_err();
        assert!(matches!(err, DbError::Decode(_)));

        let empty = Row::default();
        assert!(matches!(empty.decode::<Value>(), Err(DbError::Decode(_))));
    }
}
