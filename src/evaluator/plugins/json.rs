use crate::core::{DataType, Datum, DbError, Result};
use crate::evaluator::{EvaluationContext, ExpressionEvaluator};
use crate::json;
use crate::parser::ast::{BinaryOp, Expr};
use crate::storage::TableSchema;
use serde_json::Value;

/// `->`, `->>` and `@>`
pub struct JsonEvaluator;

impl ExpressionEvaluator for JsonEvaluator {
    fn name(&self) -> &'static str {
        "JSON"
    }

    fn can_evaluate(&self, expr: &Expr) -> bool {
        matches!(
            expr,
            Expr::BinaryOp {
                op: BinaryOp::Arrow | BinaryOp::LongArrow | BinaryOp::AtArrow,
                ..
            }
        )
    }

    fn evaluate(
        &self,
        expr: &Expr,
        row: &[Datum],
        schema: &TableSchema,
        context: &EvaluationContext<'_>,
    ) -> Result<Datum> {
        let Expr::BinaryOp { left, op, right } = expr else {
            return Err(DbError::Execution("Invalid JSON expression".into()));
        };

        let left_val = context.evaluate(left, row, schema)?;
        let right_val = context.evaluate(right, row, schema)?;

        if left_val.is_null() || right_val.is_null() {
            return Ok(Datum::Null);
        }

        let document = as_json(left_val, "left")?;

        if *op == BinaryOp::AtArrow {
            let wanted = as_json(right_val, "right")?;
            return Ok(Datum::Boolean(json::contains(&document, &wanted)));
        }

        let found = match right_val {
            Datum::Text(key) => document.get(key.as_str()).cloned(),
            Datum::Integer(i) => element(&document, i),
            other => {
                return Err(DbError::TypeMismatch(format!(
                    "right operand of {:?} must be TEXT or BIGINT, not {}",
                    op,
                    other.type_name()
                )));
            }
        };

        Ok(match (found, op) {
            (None, _) => Datum::Null,
            (Some(Value::Null), BinaryOp::LongArrow) => Datum::Null,
            (Some(Value::String(s)), BinaryOp::LongArrow) => Datum::Text(s),
            (Some(v), BinaryOp::LongArrow) => Datum::Text(v.to_string()),
            (Some(v), _) => Datum::Json(v),
        })
    }
}

/// A quoted literal on either side of a jsonb operator is read as jsonb.
fn as_json(value: Datum, side: &str) -> Result<Value> {
    match value {
        Datum::Json(v) => Ok(v),
        Datum::Text(text) => match Datum::Text(text).cast(DataType::Jsonb)? {
            Datum::Json(v) => Ok(v),
            _ => Err(DbError::TypeMismatch(format!("{} operand is not jsonb", side))),
        },
        other => Err(DbError::TypeMismatch(format!(
            "{} operand of a jsonb operator must be JSONB, not {}",
            side,
            other.type_name()
        ))),
    }
}

/// Array element; negative indexes count from the end.
fn element(document: &Value, index: i64) -> Option<Value> {
    let items = document.as_array()?;
    let position = if index < 0 {
        items.len().checked_sub(index.unsigned_abs() as usize)?
    } else {
        index as usize
    };
    items.get(position).cloned()
}
