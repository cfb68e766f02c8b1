use crate::core::{Datum, DbError, Result};
use crate::evaluator::{EvaluationContext, ExpressionEvaluator};
use crate::parser::ast::Expr;
use crate::storage::TableSchema;

pub struct IsNullEvaluator;

impl ExpressionEvaluator for IsNullEvaluator {
    fn name(&self) -> &'static str {
        "IS_NULL"
    }

    fn can_evaluate(&self, expr: &Expr) -> bool {
        matches!(expr, Expr::IsNull { .. })
    }

    fn evaluate(
        &self,
        expr: &Expr,
        row: &[Datum],
        schema: &TableSchema,
        context: &EvaluationContext<'_>,
    ) -> Result<Datum> {
        let Expr::IsNull { expr, negated } = expr else {
            return Err(DbError::Execution("Invalid IS NULL expression".into()));
        };

        let is_null = context.evaluate(expr, row, schema)?.is_null();
        Ok(Datum::Boolean(is_null != *negated))
    }
}
