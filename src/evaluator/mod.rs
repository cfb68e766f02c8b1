pub mod plugins;

use crate::core::{Datum, DbError, Result};
use crate::parser::ast::Expr;
use crate::storage::TableSchema;

/// Evaluates one family of expressions against a row.
pub trait ExpressionEvaluator: Send + Sync {
    fn name(&self) -> &'static str;

    fn can_evaluate(&self, expr: &Expr) -> bool;

    fn evaluate(
        &self,
        expr: &Expr,
        row: &[Datum],
        schema: &TableSchema,
        context: &EvaluationContext<'_>,
    ) -> Result<Datum>;
}

/// Registry plus the statement's bound parameters.
pub struct EvaluationContext<'a> {
    registry: &'a EvaluatorRegistry,
    params: &'a [Datum],
}

impl<'a> EvaluationContext<'a> {
    pub fn new(registry: &'a EvaluatorRegistry, params: &'a [Datum]) -> Self {
        Self { registry, params }
    }

    pub fn evaluate(&self, expr: &Expr, row: &[Datum], schema: &TableSchema) -> Result<Datum> {
        match expr {
            Expr::Column(name) => return Ok(row[schema.column_index(name)?].clone()),
            Expr::Placeholder(index) => return self.param(*index).cloned(),
            Expr::Literal(value) => return Ok(value.clone()),
            _ => {}
        }

        if let Some(evaluator) = self.registry.find_evaluator(expr) {
            return evaluator.evaluate(expr, row, schema, self);
        }

        Err(DbError::UnsupportedOperation(format!(
            "No evaluator found for expression: {:?}",
            expr
        )))
    }

    /// Evaluate a WHERE condition. Only `true` selects the row.
    pub fn matches(&self, expr: &Expr, row: &[Datum], schema: &TableSchema) -> Result<bool> {
        Ok(self.evaluate(expr, row, schema)?.truth()? == Some(true))
    }

    /// Evaluate an expression that must not read any column.
    pub fn evaluate_constant(&self, expr: &Expr, schema: &TableSchema) -> Result<Datum> {
        let empty = vec![Datum::Null; schema.columns().len()];
        self.evaluate(expr, &empty, schema)
    }

    fn param(&self, index: usize) -> Result<&Datum> {
        self.params.get(index).ok_or_else(|| {
            DbError::Execution(format!(
                "there is no parameter ${} ({} bound)",
                index + 1,
                self.params.len()
            ))
        })
    }
}

/// Ordered evaluators; the first one accepting an expression handles it.
pub struct EvaluatorRegistry {
    evaluators: Vec<Box<dyn ExpressionEvaluator>>,
}

impl EvaluatorRegistry {
    pub fn new() -> Self {
        Self {
            evaluators: Vec::new(),
        }
    }

    pub fn register(&mut self, evaluator: Box<dyn ExpressionEvaluator>) {
        tracing::trace!(evaluator = evaluator.name(), "registered evaluator");
        self.evaluators.push(evaluator);
    }

    pub fn with_default_evaluators() -> Self {
        use plugins::*;

        let mut registry = Self::new();

        registry.register(Box::new(json::JsonEvaluator));
        registry.register(Box::new(comparison::ComparisonEvaluator));
        registry.register(Box::new(logical::LogicalEvaluator));
        registry.register(Box::new(in_list::InListEvaluator));
        registry.register(Box::new(is_null::IsNullEvaluator));
        registry.register(Box::new(cast::CastEvaluator));

        registry
    }

    fn find_evaluator(&self, expr: &Expr) -> Option<&dyn ExpressionEvaluator> {
        self.evaluators
            .iter()
            .find(|ev| ev.can_evaluate(expr))
            .map(|boxed| &**boxed)
    }
}

impl Default for EvaluatorRegistry {
    fn default() -> Self {
        Self::with_default_evaluators()
    }
}
