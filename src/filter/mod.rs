//! Declarative document filters and their compilation into predicates.
//!
//! A [`Filter`] is an ordered list of `(field, value)` constraints. Constraints
//! are ANDed together; a list value matches when the attribute equals any of
//! its elements.
//!
//! ```
//! use jsonbdb::filter::{Filter, limit};
//!
//! let predicate = Filter::new()
//!     .with("name", "tester1")
//!     .any_of("age", [10, 20])
//!     .compile()
//!     .unwrap()
//!     .modify(&[limit(10)]);
//!
//! assert_eq!(
//!     predicate.render(),
//!     " WHERE attrs @> $1::jsonb AND (attrs -> $2::text) IN ($3::jsonb, $4::jsonb) LIMIT $5"
//! );
//! ```

pub mod compiler;
pub mod modifier;
pub mod predicate;

pub use compiler::FilterCompiler;
pub use modifier::{QueryModifier, limit, offset, order_by, order_by_desc};
pub use predicate::Predicate;

use crate::core::{DbError, Result};
use serde::Serialize;
use serde_json::{Map, Value};

/// A single `(field, value)` constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    field: String,
    value: Value,
}

impl Constraint {
    pub fn new(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn is_list(&self) -> bool {
        self.value.is_array()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    constraints: Vec<Constraint>,
}

impl Filter {
    /// The empty filter, which matches every document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a constraint. Arrays become membership tests, anything else an
    /// equality (containment) test.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.constraints.push(Constraint::new(field, value));
        self
    }

    /// Add a membership constraint from any sequence of values.
    pub fn any_of<I, V>(self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let list = values.into_iter().map(Into::into).collect::<Vec<Value>>();
        self.with(field, Value::Array(list))
    }

    /// Add a constraint from any serializable value.
    pub fn try_with<V: Serialize + ?Sized>(self, field: impl Into<String>, value: &V) -> Result<Self> {
        let field = field.into();
        let value = serde_json::to_value(value)
            .map_err(|e| DbError::Encoding(format!("value for field '{}': {}", field, e)))?;
        Ok(self.with(field, value))
    }

    pub fn push(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Constraint> {
        self.constraints.iter()
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Field -> value map; a later constraint on the same field wins.
    pub fn to_map(&self) -> Map<String, Value> {
        self.constraints
            .iter()
            .map(|c| (c.field.clone(), c.value.clone()))
            .collect()
    }

    /// Compile with the default clause plugins.
    pub fn compile(&self) -> Result<Predicate> {
        compiler::default_compiler().compile(self)
    }
}

impl<K, V> FromIterator<(K, V)> for Filter
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            constraints: iter
                .into_iter()
                .map(|(field, value)| Constraint::new(field, value))
                .collect(),
        }
    }
}

impl From<Map<String, Value>> for Filter {
    fn from(map: Map<String, Value>) -> Self {
        map.into_iter().collect()
    }
}

impl<'a> IntoIterator for &'a Filter {
    type Item = &'a Constraint;
    type IntoIter = std::slice::Iter<'a, Constraint>;

    fn into_iter(self) -> Self::IntoIter {
        self.constraints.iter()
    }
}
