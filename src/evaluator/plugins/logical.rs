use crate::core::{Datum, DbError, Result};
use crate::evaluator::{EvaluationContext, ExpressionEvaluator};
use crate::parser::ast::{BinaryOp, Expr};
use crate::storage::TableSchema;

/// AND, OR and NOT with SQL three-valued logic.
pub struct LogicalEvaluator;

impl ExpressionEvaluator for LogicalEvaluator {
    fn name(&self) -> &'static str {
        "LOGICAL"
    }

    fn can_evaluate(&self, expr: &Expr) -> bool {
        matches!(
            expr,
            Expr::Not(_)
                | Expr::BinaryOp {
                    op: BinaryOp::And | BinaryOp::Or,
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
        let truth = |e: &Expr| -> Result<Option<bool>> { context.evaluate(e, row, schema)?.truth() };

        let result = match expr {
            Expr::Not(inner) => truth(inner)?.map(|b| !b),
            Expr::BinaryOp {
                left,
                op: BinaryOp::And,
                right,
            } => match truth(left)? {
                Some(false) => Some(false),
                left_val => match (left_val, truth(right)?) {
                    (_, Some(false)) => Some(false),
                    (Some(true), Some(true)) => Some(true),
                    _ => None,
                },
            },
            Expr::BinaryOp {
                left,
                op: BinaryOp::Or,
                right,
            } => match truth(left)? {
                Some(true) => Some(true),
                left_val => match (left_val, truth(right)?) {
                    (_, Some(true)) => Some(true),
                    (Some(false), Some(false)) => Some(false),
                    _ => None,
                },
            },
            _ => return Err(DbError::Execution("Invalid logical expression".into())),
        };

        Ok(result.map(Datum::Boolean).unwrap_or(Datum::Null))
    }
}
