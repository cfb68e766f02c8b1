use crate::core::{Datum, DbError, Param, Result};
use crate::evaluator::{EvaluationContext, EvaluatorRegistry};
use crate::parser::SqlParserAdapter;
use crate::parser::ast::*;
use crate::rows::Row;
use crate::storage::{Catalog, TableSchema};
use std::cmp::Ordering;

/// Result of running one statement.
#[derive(Debug)]
pub enum Outcome {
    Command(u64),
    Rows { columns: Vec<String>, rows: Vec<Row> },
}

impl Outcome {
    pub fn rows_affected(&self) -> u64 {
        match self {
            Self::Command(n) => *n,
            Self::Rows { rows, .. } => rows.len() as u64,
        }
    }
}

/// Parses and runs statements against a [`Catalog`].
pub struct Engine {
    parser: SqlParserAdapter,
    registry: EvaluatorRegistry,
}

impl Engine {
    pub fn new() -> Self {
        Self {
            parser: SqlParserAdapter::new(),
            registry: EvaluatorRegistry::with_default_evaluators(),
        }
    }

    pub fn parse(&self, sql: &str) -> Result<Statement> {
        self.parser.parse(sql)
    }

    /// Run a read-only statement.
    pub fn read(&self, catalog: &Catalog, stmt: &Statement, params: &[Param]) -> Result<Outcome> {
        let Statement::Query(query) = stmt else {
            return Err(DbError::Execution(format!("{} is not read-only", stmt.kind())));
        };
        let params = bind(params);
        self.select(catalog, query, &params)
    }

    /// Run a statement that may write. Either the whole statement applies
    /// or `catalog` is left untouched.
    pub fn write(&self, catalog: &mut Catalog, stmt: &Statement, params: &[Param]) -> Result<Outcome> {
        let params = bind(params);
        let mut working = catalog.clone();

        let outcome = match stmt {
            Statement::Query(query) => return self.select(catalog, query, &params),
            Statement::CreateTable(create) => {
                let schema = TableSchema::new(&create.table_name, create.columns.clone())?;
                working.create_table(schema, create.if_not_exists)?;
                Outcome::Command(0)
            }
            Statement::Insert(insert) => Outcome::Command(self.insert(&mut working, insert, &params)?),
            Statement::Update(update) => Outcome::Command(self.update(&mut working, update, &params)?),
            Statement::Delete(delete) => Outcome::Command(self.delete(&mut working, delete, &params)?),
        };

        *catalog = working;
        Ok(outcome)
    }

    fn context<'a>(&'a self, params: &'a [Datum]) -> EvaluationContext<'a> {
        EvaluationContext::new(&self.registry, params)
    }

    fn select(&self, catalog: &Catalog, query: &QueryStmt, params: &[Datum]) -> Result<Outcome> {
        let table = catalog.get(&query.table_name)?;
        let schema = table.schema();
        let context = self.context(params);

        let mut selected = Vec::with_capacity(table.len());
        for row in table.rows() {
            let keep = match &query.selection {
                Some(condition) => context.matches(condition, row, schema)?,
                None => true,
            };
            if keep {
                selected.push(row);
            }
        }

        if query.projection == Projection::CountStar {
            let count = Row::new(vec![serde_json::Value::from(selected.len() as i64)]);
            let rows = paginate(vec![count], query, &context, schema)?;
            return Ok(Outcome::Rows {
                columns: vec!["count".to_string()],
                rows,
            });
        }

        if !query.order_by.is_empty() {
            let mut keyed = selected
                .into_iter()
                .map(|row| {
                    let keys = query
                        .order_by
                        .iter()
                        .map(|order| context.evaluate(&order.expr, row, schema))
                        .collect::<Result<Vec<_>>>()?;
                    Ok((keys, row))
                })
                .collect::<Result<Vec<_>>>()?;

            keyed.sort_by(|(a, _), (b, _)| {
                query
                    .order_by
                    .iter()
                    .zip(a.iter().zip(b))
                    .map(|(order, (x, y))| order_cmp(order, x, y))
                    .find(|ord| ord.is_ne())
                    .unwrap_or(Ordering::Equal)
            });
            selected = keyed.into_iter().map(|(_, row)| row).collect();
        }

        let (columns, indexes) = match &query.projection {
            Projection::Columns(names) => {
                let indexes = names
                    .iter()
                    .map(|name| schema.column_index(name))
                    .collect::<Result<Vec<_>>>()?;
                (names.clone(), indexes)
            }
            _ => (
                schema.columns().iter().map(|c| c.name.clone()).collect(),
                (0..schema.columns().len()).collect(),
            ),
        };

        let rows = selected
            .into_iter()
            .map(|row| Row::new(indexes.iter().map(|&i| row[i].clone().into_json()).collect()))
            .collect();

        Ok(Outcome::Rows {
            columns,
            rows: paginate(rows, query, &context, schema)?,
        })
    }

    fn insert(&self, catalog: &mut Catalog, insert: &InsertStmt, params: &[Datum]) -> Result<u64> {
        let table = catalog.get_mut(&insert.table_name)?;
        let schema = table.schema().clone();
        let context = self.context(params);

        let targets = if insert.columns.is_empty() {
            (0..schema.columns().len()).collect::<Vec<_>>()
        } else {
            insert
                .columns
                .iter()
                .map(|name| schema.column_index(name))
                .collect::<Result<Vec<_>>>()?
        };

        for values in &insert.values {
            if values.len() != targets.len() {
                return Err(DbError::Execution(format!(
                    "INSERT has {} target columns but {} expressions",
                    targets.len(),
                    values.len()
                )));
            }

            let mut row = vec![Datum::Null; schema.columns().len()];
            for (&index, expr) in targets.iter().zip(values) {
                row[index] = context.evaluate_constant(expr, &schema)?;
            }
            table.insert(row)?;
        }

        Ok(insert.values.len() as u64)
    }

    fn update(&self, catalog: &mut Catalog, update: &UpdateStmt, params: &[Datum]) -> Result<u64> {
        let table = catalog.get_mut(&update.table_name)?;
        let schema = table.schema().clone();
        let context = self.context(params);

        let targets = update
            .assignments
            .iter()
            .map(|assign| Ok((schema.column_index(&assign.column)?, &assign.value)))
            .collect::<Result<Vec<_>>>()?;

        let mut changes = Vec::new();
        for (index, row) in table.rows().enumerate() {
            let matched = match &update.selection {
                Some(condition) => context.matches(condition, row, &schema)?,
                None => true,
            };
            if !matched {
                continue;
            }

            let mut new_row = row.clone();
            for (column, expr) in &targets {
                new_row[*column] = context.evaluate(expr, row, &schema)?;
            }
            changes.push((index, new_row));
        }

        let affected = changes.len() as u64;
        for (index, row) in changes {
            table.update(index, row)?;
        }
        Ok(affected)
    }

    fn delete(&self, catalog: &mut Catalog, delete: &DeleteStmt, params: &[Datum]) -> Result<u64> {
        let table = catalog.get_mut(&delete.table_name)?;
        if table.is_empty() {
            return Ok(0);
        }
        let schema = table.schema().clone();
        let context = self.context(params);

        let mut doomed = Vec::new();
        for (index, row) in table.rows().enumerate() {
            let matched = match &delete.selection {
                Some(condition) => context.matches(condition, row, &schema)?,
                None => true,
            };
            if matched {
                doomed.push(index);
            }
        }

        Ok(table.delete(&doomed) as u64)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

fn bind(params: &[Param]) -> Vec<Datum> {
    params.iter().map(Datum::from).collect()
}

/// NULLS LAST unless the key asks otherwise; DESC reverses only non-null values.
fn order_cmp(order: &OrderByExpr, a: &Datum, b: &Datum) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) if order.nulls_first => Ordering::Less,
        (true, false) => Ordering::Greater,
        (false, true) if order.nulls_first => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let ord = a.sort_cmp(b);
            if order.descending { ord.reverse() } else { ord }
        }
    }
}

fn paginate(
    rows: Vec<Row>,
    query: &QueryStmt,
    context: &EvaluationContext<'_>,
    schema: &TableSchema,
) -> Result<Vec<Row>> {
    let offset = count_clause(query.offset.as_ref(), "OFFSET", context, schema)?.unwrap_or(0);
    let limit = count_clause(query.limit.as_ref(), "LIMIT", context, schema)?;

    let rows = rows.into_iter().skip(offset);
    Ok(match limit {
        Some(limit) => rows.take(limit).collect(),
        None => rows.collect(),
    })
}

fn count_clause(
    expr: Option<&Expr>,
    clause: &str,
    context: &EvaluationContext<'_>,
    schema: &TableSchema,
) -> Result<Option<usize>> {
    let Some(expr) = expr else {
        return Ok(None);
    };

    match context.evaluate_constant(expr, schema)? {
        Datum::Null => Ok(None),
        Datum::Integer(n) if n >= 0 => Ok(Some(usize::try_from(n).unwrap_or(usize::MAX))),
        Datum::Integer(_) => Err(DbError::Execution(format!("{} must not be negative", clause))),
        other => Err(DbError::TypeMismatch(format!(
            "{} must be an integer, not {}",
            clause,
            other.type_name()
        ))),
    }
}
