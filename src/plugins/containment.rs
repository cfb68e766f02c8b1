use super::ClausePlugin;
use crate::core::{Param, Result};
use crate::filter::{Constraint, Predicate};
use serde_json::{Map, Value};

/// `attrs @> $k::jsonb` with `{field: value}` bound as the jsonb literal.
///
/// Handles scalars as well as nested objects, which match by structural
/// containment.
pub struct ContainmentClause;

impl ClausePlugin for ContainmentClause {
    fn name(&self) -> &'static str {
        "CONTAINMENT"
    }

    fn can_handle(&self, _value: &Value) -> bool {
        true
    }

    fn compile(&self, constraint: &Constraint, predicate: &mut Predicate) -> Result<String> {
        let mut document = Map::with_capacity(1);
        document.insert(constraint.field().to_string(), constraint.value().clone());

        let placeholder = predicate.bind(Param::Json(Value::Object(document)));
        Ok(format!("attrs @> {}::jsonb", placeholder))
    }
}
