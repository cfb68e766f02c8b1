use super::comparison::{align, column_type, compare};
use crate::core::{Datum, DbError, Result};
use crate::evaluator::{EvaluationContext, ExpressionEvaluator};
use crate::parser::ast::Expr;
use crate::storage::TableSchema;
use std::cmp::Ordering;

pub struct InListEvaluator;

impl ExpressionEvaluator for InListEvaluator {
    fn name(&self) -> &'static str {
        "IN_LIST"
    }

    fn can_evaluate(&self, expr: &Expr) -> bool {
        matches!(expr, Expr::InList { .. })
    }

    fn evaluate(
        &self,
        expr: &Expr,
        row: &[Datum],
        schema: &TableSchema,
        context: &EvaluationContext<'_>,
    ) -> Result<Datum> {
        let Expr::InList { expr, list, negated } = expr else {
            return Err(DbError::Execution("Invalid IN expression".into()));
        };

        let left = context.evaluate(expr, row, schema)?;
        if left.is_null() {
            return Ok(Datum::Null);
        }
        let left_type = column_type(expr, schema);

        let mut saw_null = false;

        for item in list {
            let (left, right) = align(
                (left.clone(), left_type),
                (context.evaluate(item, row, schema)?, column_type(item, schema)),
            )?;
            match compare(left, right)? {
                Some(Ordering::Equal) => return Ok(Datum::Boolean(!*negated)),
                Some(_) => {}
                None => saw_null = true,
            }
        }

        if saw_null {
            return Ok(Datum::Null);
        }

        Ok(Datum::Boolean(*negated))
    }
}

#[cfg(test)]
mod tests {
    use crate::core::Datum;
    use crate::evaluator::test_support::eval;
    use serde_json::json;

    #[test]
    fn test_membership() {
        let doc = json!({"name": "tester2", "age": 10});
        let params = [
            Datum::Text("name".into()),
            Datum::Json(json!("tester1")),
            Datum::Json(json!("tester2")),
        ];
        assert_eq!(
            eval("(attrs -> $1::text) IN ($2::jsonb, $3::jsonb)", doc.clone(), &params).unwrap(),
            Datum::Boolean(true)
        );
        assert_eq!(
            eval("(attrs -> $1::text) NOT IN ($2::jsonb, $3::jsonb)", doc, &params).unwrap(),
            Datum::Boolean(false)
        );
    }

    #[test]
    fn test_missing_field_is_unknown() {
        let params = [Datum::Text("name".into()), Datum::Json(json!("a"))];
        assert_eq!(eval("(attrs -> $1::text) IN ($2::jsonb)", json!({}), &params).unwrap(), Datum::Null);
    }

    #[test]
    fn test_null_item_makes_miss_unknown() {
        let doc = json!({"age": 10});
        assert_eq!(eval("(attrs -> 'age') IN ('11', NULL)", doc.clone(), &[]).unwrap(), Datum::Null);
        assert_eq!(eval("(attrs -> 'age') IN ('10', NULL)", doc, &[]).unwrap(), Datum::Boolean(true));
    }
}
