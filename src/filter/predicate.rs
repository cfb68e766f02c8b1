use crate::core::Param;

/// Kind of a tail modifier; at most one of each kind is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailKind {
    Limit,
    Offset,
}

impl TailKind {
    fn keyword(&self) -> &'static str {
        match self {
            Self::Limit => "LIMIT",
            Self::Offset => "OFFSET",
        }
    }
}

/// Compiled filter: clause text with `$n` placeholders plus the ordered
/// parameters those placeholders refer to.
///
/// An empty clause is the match-all predicate and renders no `WHERE` at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    clause: String,
    order_by: Vec<String>,
    tail: Vec<(TailKind, usize)>,
    params: Vec<Param>,
}

impl Predicate {
    pub fn match_all() -> Self {
        Self::default()
    }

    /// Bind a parameter and return its placeholder.
    pub fn bind(&mut self, param: impl Into<Param>) -> String {
        self.params.push(param.into());
        format!("${}", self.params.len())
    }

    /// AND another clause onto the predicate.
    pub fn push_clause(&mut self, clause: &str) {
        if !self.clause.is_empty() {
            self.clause.push_str(" AND ");
        }
        self.clause.push_str(clause);
    }

    pub(crate) fn push_order(&mut self, key: String) {
        self.order_by.push(key);
    }

    /// Set a tail modifier. Re-setting a kind overwrites its bound value in
    /// place, keeping its original position and placeholder.
    pub(crate) fn set_tail(&mut self, kind: TailKind, value: i64) {
        if let Some((_, index)) = self.tail.iter().find(|(k, _)| *k == kind) {
            self.params[*index] = Param::Int(value);
            return;
        }
        self.bind(Param::Int(value));
        self.tail.push((kind, self.params.len() - 1));
    }

    pub fn clause(&self) -> &str {
        &self.clause
    }

    pub fn is_match_all(&self) -> bool {
        self.clause.is_empty()
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn into_params(self) -> Vec<Param> {
        self.params
    }

    /// `""` for the match-all predicate, otherwise `" WHERE <clause>"`.
    pub fn where_clause(&self) -> String {
        if self.is_match_all() {
            String::new()
        } else {
            format!(" WHERE {}", self.clause)
        }
    }

    /// Everything that follows the table name in a `SELECT`:
    /// `WHERE`, then `ORDER BY`, then the limit/offset tail in call order.
    pub fn render(&self) -> String {
        let mut sql = self.where_clause();
        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by.join(", "));
        }
        for (kind, index) in &self.tail {
            sql.push_str(&format!(" {} ${}", kind.keyword(), index + 1));
        }
        sql
    }
}
