use crate::core::{DataType, Datum, DbError, Result};
use crate::evaluator::{EvaluationContext, ExpressionEvaluator};
use crate::parser::ast::{BinaryOp, Expr};
use crate::storage::TableSchema;
use std::cmp::Ordering;

pub struct ComparisonEvaluator;

impl ExpressionEvaluator for ComparisonEvaluator {
    fn name(&self) -> &'static str {
        "COMPARISON"
    }

    fn can_evaluate(&self, expr: &Expr) -> bool {
        matches!(
            expr,
            Expr::BinaryOp {
                op: BinaryOp::Eq
                    | BinaryOp::NotEq
                    | BinaryOp::Lt
                    | BinaryOp::LtEq
                    | BinaryOp::Gt
                    | BinaryOp::GtEq,
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
            return Err(DbError::Execution("Invalid comparison expression".into()));
        };

        let (left_val, right_val) = align(
            (context.evaluate(left, row, schema)?, column_type(left, schema)),
            (context.evaluate(right, row, schema)?, column_type(right, schema)),
        )?;

        let Some(ord) = compare(left_val, right_val)? else {
            return Ok(Datum::Null);
        };

        let result = match op {
            BinaryOp::Eq => ord == Ordering::Equal,
            BinaryOp::NotEq => ord != Ordering::Equal,
            BinaryOp::Lt => ord == Ordering::Less,
            BinaryOp::LtEq => ord != Ordering::Greater,
            BinaryOp::Gt => ord == Ordering::Greater,
            BinaryOp::GtEq => ord != Ordering::Less,
            _ => return Err(DbError::Execution(format!("{:?} is not a comparison", op))),
        };

        Ok(Datum::Boolean(result))
    }
}

/// Type of `expr` when it is a bare column reference.
pub(crate) fn column_type(expr: &Expr, schema: &TableSchema) -> Option<DataType> {
    match expr {
        Expr::Column(name) => schema
            .find_column_index(name)
            .map(|index| schema.columns()[index].data_type),
        _ => None,
    }
}

/// An operand compared with a typed column takes the column's type, the
/// way an untyped parameter is inferred from its counterpart.
pub(crate) fn align(
    (left, left_type): (Datum, Option<DataType>),
    (right, right_type): (Datum, Option<DataType>),
) -> Result<(Datum, Datum)> {
    match (left_type, right_type) {
        (Some(ty), None) => Ok((left, ty.coerce(right)?)),
        (None, Some(ty)) => Ok((ty.coerce(left)?, right)),
        _ => Ok((left, right)),
    }
}

/// SQL comparison with the implicit text-to-jsonb coercion a quoted literal
/// gets when compared with a jsonb value.
pub(crate) fn compare(left: Datum, right: Datum) -> Result<Option<Ordering>> {
    let (left, right) = match (left, right) {
        (Datum::Json(j), Datum::Text(t)) => (Datum::Json(j), Datum::Text(t).cast(DataType::Jsonb)?),
        (Datum::Text(t), Datum::Json(j)) => (Datum::Text(t).cast(DataType::Jsonb)?, Datum::Json(j)),
        pair => pair,
    };
    left.compare(&right)
}
