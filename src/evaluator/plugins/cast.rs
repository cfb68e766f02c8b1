use crate::core::{Datum, DbError, Result};
use crate::evaluator::{EvaluationContext, ExpressionEvaluator};
use crate::parser::ast::Expr;
use crate::storage::TableSchema;

/// `expr::type`
pub struct CastEvaluator;

impl ExpressionEvaluator for CastEvaluator {
    fn name(&self) -> &'static str {
        "CAST"
    }

    fn can_evaluate(&self, expr: &Expr) -> bool {
        matches!(expr, Expr::Cast { .. })
    }

    fn evaluate(
        &self,
        expr: &Expr,
        row: &[Datum],
        schema: &TableSchema,
        context: &EvaluationContext<'_>,
    ) -> Result<Datum> {
        let Expr::Cast { expr, data_type } = expr else {
            return Err(DbError::Execution("Invalid cast expression".into()));
        };

        context.evaluate(expr, row, schema)?.cast(*data_type)
    }
}

#[cfg(test)]
mod tests {
    use crate::core::{Datum, DbError};
    use crate::evaluator::test_support::eval;
    use serde_json::json;

    #[test]
    fn test_text_param_cast_to_jsonb() {
        let doc = json!({"tags": ["a"]});
        let params = [Datum::Text("{\"tags\": [\"a\"]}".into())];
        assert_eq!(eval("attrs @> $1::jsonb", doc, &params).unwrap(), Datum::Boolean(true));
    }

    #[test]
    fn test_invalid_cast() {
        let err = eval("attrs @> $1::jsonb", json!({}), &[Datum::Text("{oops".into())]).unwrap_err();
        assert!(matches!(err, DbError::TypeMismatch(_)));
    }
}
