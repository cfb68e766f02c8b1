use super::ClausePlugin;
use crate::core::{DbError, Param, Result};
use crate::filter::{Constraint, Predicate};
use serde_json::Value;

/// `(attrs -> $k::text) IN ($a::jsonb, $b::jsonb, ...)` for list values.
///
/// Elements compare as jsonb, so `10` matches the number 10 but not the
/// string `"10"`. An empty list matches nothing.
pub struct MembershipClause;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScalarKind {
    String,
    Number,
    Bool,
}

impl ScalarKind {
    fn of(value: &Value) -> Option<Self> {
        match value {
            Value::String(_) => Some(Self::String),
            Value::Number(_) => Some(Self::Number),
            Value::Bool(_) => Some(Self::Bool),
            _ => None,
        }
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl ClausePlugin for MembershipClause {
    fn name(&self) -> &'static str {
        "MEMBERSHIP"
    }

    fn can_handle(&self, value: &Value) -> bool {
        value.is_array()
    }

    fn compile(&self, constraint: &Constraint, predicate: &mut Predicate) -> Result<String> {
        let Value::Array(elements) = constraint.value() else {
            return Err(DbError::Encoding(format!(
                "membership on field '{}' needs a list, got {}",
                constraint.field(),
                kind_name(constraint.value())
            )));
        };

        let mut expected = None;
        for element in elements {
            let kind = ScalarKind::of(element).ok_or_else(|| {
                DbError::Encoding(format!(
                    "list for field '{}' contains a non-scalar {} element",
                    constraint.field(),
                    kind_name(element)
                ))
            })?;
            match expected {
                None => expected = Some(kind),
                Some(first) if first != kind => {
                    return Err(DbError::Encoding(format!(
                        "list for field '{}' mixes {:?} and {:?} elements",
                        constraint.field(),
                        first,
                        kind
                    )));
                }
                Some(_) => {}
            }
        }

        if elements.is_empty() {
            return Ok("FALSE".to_string());
        }

        let field = predicate.bind(Param::Text(constraint.field().to_string()));
        let members = elements
            .iter()
            .map(|element| format!("{}::jsonb", predicate.bind(Param::Json(element.clone()))))
            .collect::<Vec<_>>();

        Ok(format!("(attrs -> {}::text) IN ({})", field, members.join(", ")))
    }
}
