use super::{Row, RowSource};
use crate::core::{DbError, Result};

/// A fully fetched result set exposed through the [`RowSource`] cursor.
#[derive(Debug)]
pub struct BufferedRows {
    columns: Vec<String>,
    pending: std::vec::IntoIter<Row>,
    current: Option<Row>,
    closed: bool,
}

impl BufferedRows {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self {
            columns,
            pending: rows.into_iter(),
            current: None,
            closed: false,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    /// Rows not yet visited.
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl RowSource for BufferedRows {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn advance(&mut self) -> Result<bool> {
        if self.closed {
            return Ok(false);
        }
        self.current = self.pending.next();
        Ok(self.current.is_some())
    }

    fn row(&self) -> Result<&Row> {
        self.current
            .as_ref()
            .ok_or_else(|| DbError::Decode("no current row; call advance first".into()))
    }

    fn close(&mut self) {
        self.closed = true;
        self.current = None;
        self.pending = Vec::new().into_iter();
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_forward_only_traversal() {
        let mut rows = BufferedRows::new(
            vec!["attrs".into()],
            vec![Row::new(vec![json!(1)]), Row::new(vec![json!(2)])],
        );
        assert_eq!(rows.columns(), &["attrs".to_string()]);
        assert!(rows.row().is_err());

        assert!(rows.advance().unwrap());
        assert_eq!(rows.row().unwrap().get(0), Some(&json!(1)));
        assert!(rows.advance().unwrap());
        assert_eq!(rows.remaining(), 0);
        assert!(!rows.advance().unwrap());
        assert!(rows.row().is_err());
    }

    #[test]
    fn test_close_ends_the_cursor() {
        let mut rows = BufferedRows::new(vec![], vec![Row::new(vec![json!(1)])]);
        rows.close();
        assert!(rows.is_closed());
        assert!(!rows.advance().unwrap());
    }
}
