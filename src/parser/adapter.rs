use super::ast::*;
use crate::core::{DataType, Datum, DbError, Result};
use sqlparser::ast as sql_ast;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

/// Translates PostgreSQL text into the engine's statement tree.
///
/// Only the shapes the document layer emits are accepted: single-table
/// statements, `$n` placeholders, casts, the jsonb operators `->`, `->>`
/// and `@>`, comparisons, boolean logic and `IN` lists.
pub struct SqlParserAdapter {
    dialect: PostgreSqlDialect,
}

impl SqlParserAdapter {
    pub fn new() -> Self {
        Self {
            dialect: PostgreSqlDialect {},
        }
    }

    /// Parse exactly one statement.
    pub fn parse(&self, sql: &str) -> Result<Statement> {
        let trimmed = sql.trim().trim_end_matches(';').trim().to_ascii_uppercase();
        if matches!(
            trimmed.as_str(),
            "BEGIN" | "BEGIN TRANSACTION" | "START TRANSACTION" | "COMMIT" | "ROLLBACK"
        ) {
            return Err(DbError::UnsupportedOperation(format!(
                "{} must go through Backend::begin and the returned transaction",
                trimmed
            )));
        }

        let mut statements = Parser::parse_sql(&self.dialect, sql)?;
        if statements.len() != 1 {
            return Err(DbError::Parse(format!(
                "expected exactly one statement, found {}",
                statements.len()
            )));
        }

        self.convert_statement(statements.remove(0))
    }

    fn convert_statement(&self, stmt: sql_ast::Statement) -> Result<Statement> {
        match stmt {
            sql_ast::Statement::CreateTable(create) => {
                Ok(Statement::CreateTable(self.convert_create_table(create)?))
            }
            sql_ast::Statement::Insert(insert) => Ok(Statement::Insert(self.convert_insert(insert)?)),
            sql_ast::Statement::Query(query) => Ok(Statement::Query(self.convert_query(*query)?)),
            sql_ast::Statement::Update {
                table,
                assignments,
                selection,
                ..
            } => Ok(Statement::Update(self.convert_update(table, assignments, selection)?)),
            sql_ast::Statement::Delete(delete) => Ok(Statement::Delete(self.convert_delete(delete)?)),
            _ => Err(DbError::UnsupportedOperation(format!(
                "Statement type not supported: {}",
                stmt
            ))),
        }
    }

    fn convert_create_table(&self, create: sql_ast::CreateTable) -> Result<CreateTableStmt> {
        if !create.constraints.is_empty() {
            return Err(DbError::UnsupportedOperation(
                "table-level constraints are not supported; declare PRIMARY KEY on the column".into(),
            ));
        }

        let table_name = extract_table_name(&create.name)?;
        let columns = create
            .columns
            .into_iter()
            .map(|col| self.convert_column_def(col))
            .collect::<Result<Vec<_>>>()?;

        if columns.iter().filter(|c| c.primary_key).count() > 1 {
            return Err(DbError::UnsupportedOperation(
                "at most one PRIMARY KEY column is supported".into(),
            ));
        }

        Ok(CreateTableStmt {
            table_name,
            columns,
            if_not_exists: create.if_not_exists,
        })
    }

    fn convert_column_def(&self, col: sql_ast::ColumnDef) -> Result<ColumnDef> {
        let data_type = DataType::parse(&col.data_type.to_string())?;
        let primary_key = col.options.iter().any(|opt| {
            opt.option
                .to_string()
                .to_ascii_uppercase()
                .starts_with("PRIMARY KEY")
        });
        let not_null = col
            .options
            .iter()
            .any(|opt| matches!(opt.option, sql_ast::ColumnOption::NotNull));

        Ok(ColumnDef {
            name: col.name.value,
            data_type,
            primary_key,
            nullable: !(primary_key || not_null),
        })
    }

    fn convert_insert(&self, insert: sql_ast::Insert) -> Result<InsertStmt> {
        let table_name = insert.table.to_string();
        let columns = insert.columns.into_iter().map(|id| id.value).collect();

        let Some(source) = insert.source else {
            return Err(DbError::Parse("INSERT requires a VALUES clause".into()));
        };
        let sql_ast::SetExpr::Values(vals) = *source.body else {
            return Err(DbError::UnsupportedOperation("Only VALUES clause supported".into()));
        };

        let values = vals
            .rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|expr| self.convert_expr(expr))
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(InsertStmt {
            table_name,
            columns,
            values,
        })
    }

    fn convert_query(&self, query: sql_ast::Query) -> Result<QueryStmt> {
        let order_by = self.convert_order_by(query.order_by)?;
        let (limit, offset) = self.convert_limit_clause(query.limit_clause)?;

        let sql_ast::SetExpr::Select(select) = *query.body else {
            return Err(DbError::UnsupportedOperation("Only SELECT queries supported".into()));
        };

        if select.from.len() != 1 || !select.from[0].joins.is_empty() {
            return Err(DbError::UnsupportedOperation(
                "SELECT must read exactly one table without joins".into(),
            ));
        }
        let table_name = match &select.from[0].relation {
            sql_ast::TableFactor::Table { name, .. } => extract_table_name(name)?,
            _ => {
                return Err(DbError::UnsupportedOperation(
                    "Complex table references not supported".into(),
                ));
            }
        };

        let projection = self.convert_projection(select.projection)?;
        let selection = select.selection.map(|expr| self.convert_expr(expr)).transpose()?;

        Ok(QueryStmt {
            table_name,
            projection,
            selection,
            order_by,
            limit,
            offset,
        })
    }

    fn convert_projection(&self, items: Vec<sql_ast::SelectItem>) -> Result<Projection> {
        let mut columns = Vec::with_capacity(items.len());

        for item in items {
            match item {
                sql_ast::SelectItem::Wildcard(_) => return Ok(Projection::Wildcard),
                sql_ast::SelectItem::UnnamedExpr(expr) => {
                    if is_count_star(&expr) {
                        return Ok(Projection::CountStar);
                    }
                    match self.convert_expr(expr)? {
                        Expr::Column(name) => columns.push(name),
                        other => {
                            return Err(DbError::UnsupportedOperation(format!(
                                "only plain columns can be selected, got {:?}",
                                other
                            )));
                        }
                    }
                }
                other => {
                    return Err(DbError::UnsupportedOperation(format!(
                        "unsupported select item: {}",
                        other
                    )));
                }
            }
        }

        Ok(Projection::Columns(columns))
    }

    fn convert_update(
        &self,
        table: sql_ast::TableWithJoins,
        assignments: Vec<sql_ast::Assignment>,
        selection: Option<sql_ast::Expr>,
    ) -> Result<UpdateStmt> {
        let table_name = match table.relation {
            sql_ast::TableFactor::Table { name, .. } => extract_table_name(&name)?,
            _ => {
                return Err(DbError::UnsupportedOperation(
                    "Complex table references not supported in UPDATE".into(),
                ));
            }
        };

        let assignments = assignments
            .into_iter()
            .map(|assign| {
                let column = match assign.target {
                    sql_ast::AssignmentTarget::ColumnName(col_name) => {
                        let column = col_name.to_string();
                        if column.contains('.') {
                            return Err(DbError::UnsupportedOperation(
                                "Qualified column names not supported in UPDATE".into(),
                            ));
                        }
                        column
                    }
                    _ => {
                        return Err(DbError::UnsupportedOperation(
                            "Only simple column names supported in UPDATE".into(),
                        ));
                    }
                };

                let value = self.convert_expr(assign.value)?;
                Ok(Assignment { column, value })
            })
            .collect::<Result<Vec<_>>>()?;

        let selection = selection.map(|expr| self.convert_expr(expr)).transpose()?;

        Ok(UpdateStmt {
            table_name,
            assignments,
            selection,
        })
    }

    fn convert_delete(&self, delete: sql_ast::Delete) -> Result<DeleteStmt> {
        let tables = match delete.from {
            sql_ast::FromTable::WithFromKeyword(tables) => tables,
            sql_ast::FromTable::WithoutKeyword(tables) => tables,
        };
        let Some(first) = tables.first() else {
            return Err(DbError::Parse("DELETE requires a table name".into()));
        };
        let table_name = match &first.relation {
            sql_ast::TableFactor::Table { name, .. } => extract_table_name(name)?,
            _ => {
                return Err(DbError::UnsupportedOperation(
                    "Complex table references not supported in DELETE".into(),
                ));
            }
        };

        let selection = delete.selection.map(|expr| self.convert_expr(expr)).transpose()?;

        Ok(DeleteStmt {
            table_name,
            selection,
        })
    }

    fn convert_order_by(&self, order_by: Option<sql_ast::OrderBy>) -> Result<Vec<OrderByExpr>> {
        let Some(order_by) = order_by else {
            return Ok(Vec::new());
        };

        match order_by.kind {
            sql_ast::OrderByKind::Expressions(exprs) => exprs
                .into_iter()
                .map(|order| {
                    let descending = order.options.asc.map(|asc| !asc).unwrap_or(false);
                    Ok(OrderByExpr {
                        expr: self.convert_expr(order.expr)?,
                        descending,
                        nulls_first: order.options.nulls_first.unwrap_or(descending),
                    })
                })
                .collect(),
            sql_ast::OrderByKind::All(_) => {
                Err(DbError::UnsupportedOperation("ORDER BY ALL not supported".into()))
            }
        }
    }

    /// LIMIT and OFFSET in either order, as placeholders or literals.
    fn convert_limit_clause(
        &self,
        clause: Option<sql_ast::LimitClause>,
    ) -> Result<(Option<Expr>, Option<Expr>)> {
        let Some(clause) = clause else {
            return Ok((None, None));
        };

        match clause {
            sql_ast::LimitClause::LimitOffset { limit, offset, .. } => {
                let limit = limit.map(|expr| self.convert_expr(expr)).transpose()?;
                let offset = offset.map(|o| self.convert_expr(o.value)).transpose()?;
                Ok((limit, offset))
            }
            sql_ast::LimitClause::OffsetCommaLimit { offset, limit } => {
                Ok((Some(self.convert_expr(limit)?), Some(self.convert_expr(offset)?)))
            }
        }
    }

    pub(crate) fn convert_expr(&self, expr: sql_ast::Expr) -> Result<Expr> {
        match expr {
            sql_ast::Expr::Identifier(ident) => Ok(Expr::Column(ident.value)),
            sql_ast::Expr::CompoundIdentifier(idents) => idents
                .into_iter()
                .last()
                .map(|ident| Expr::Column(ident.value))
                .ok_or_else(|| DbError::Parse("empty identifier".into())),
            sql_ast::Expr::Value(value) => self.convert_value(value.value),
            sql_ast::Expr::Nested(inner) => self.convert_expr(*inner),
            sql_ast::Expr::Cast { expr, data_type, .. } => Ok(Expr::Cast {
                expr: Box::new(self.convert_expr(*expr)?),
                data_type: DataType::parse(&data_type.to_string())?,
            }),
            sql_ast::Expr::BinaryOp { left, op, right } => Ok(Expr::BinaryOp {
                left: Box::new(self.convert_expr(*left)?),
                op: convert_binary_op(&op)?,
                right: Box::new(self.convert_expr(*right)?),
            }),
            sql_ast::Expr::UnaryOp {
                op: sql_ast::UnaryOperator::Not,
                expr,
            } => Ok(Expr::Not(Box::new(self.convert_expr(*expr)?))),
            sql_ast::Expr::IsNull(inner) => Ok(Expr::IsNull {
                expr: Box::new(self.convert_expr(*inner)?),
                negated: false,
            }),
            sql_ast::Expr::IsNotNull(inner) => Ok(Expr::IsNull {
                expr: Box::new(self.convert_expr(*inner)?),
                negated: true,
            }),
            sql_ast::Expr::InList { expr, list, negated } => Ok(Expr::InList {
                expr: Box::new(self.convert_expr(*expr)?),
                list: list
                    .into_iter()
                    .map(|item| self.convert_expr(item))
                    .collect::<Result<Vec<_>>>()?,
                negated,
            }),
            other => Err(DbError::UnsupportedOperation(format!(
                "Expression not supported: {}",
                other
            ))),
        }
    }

    fn convert_value(&self, value: sql_ast::Value) -> Result<Expr> {
        match value {
            sql_ast::Value::Placeholder(name) => {
                let position = name
                    .strip_prefix('$')
                    .and_then(|n| n.parse::<usize>().ok())
                    .filter(|n| *n > 0)
                    .ok_or_else(|| {
                        DbError::Parse(format!("unsupported placeholder '{}', expected $n", name))
                    })?;
                Ok(Expr::Placeholder(position - 1))
            }
            sql_ast::Value::Number(n, _) => {
                let n = n.to_string();
                n.parse::<i64>()
                    .map(|i| Expr::Literal(Datum::Integer(i)))
                    .or_else(|_| {
                        serde_json::from_str::<serde_json::Value>(&n)
                            .map(|v| Expr::Literal(Datum::Json(v)))
                            .map_err(|_| DbError::Parse(format!("invalid number: {}", n)))
                    })
            }
            sql_ast::Value::SingleQuotedString(s) => Ok(Expr::Literal(Datum::Text(s))),
            sql_ast::Value::Boolean(b) => Ok(Expr::Literal(Datum::Boolean(b))),
            sql_ast::Value::Null => Ok(Expr::Literal(Datum::Null)),
            other => Err(DbError::UnsupportedOperation(format!(
                "Literal not supported: {}",
                other
            ))),
        }
    }
}

impl Default for SqlParserAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn convert_binary_op(op: &sql_ast::BinaryOperator) -> Result<BinaryOp> {
    use sql_ast::BinaryOperator as Op;

    match op {
        Op::Eq => Ok(BinaryOp::Eq),
        Op::NotEq => Ok(BinaryOp::NotEq),
        Op::Lt => Ok(BinaryOp::Lt),
        Op::LtEq => Ok(BinaryOp::LtEq),
        Op::Gt => Ok(BinaryOp::Gt),
        Op::GtEq => Ok(BinaryOp::GtEq),
        Op::And => Ok(BinaryOp::And),
        Op::Or => Ok(BinaryOp::Or),
        Op::Arrow => Ok(BinaryOp::Arrow),
        Op::LongArrow => Ok(BinaryOp::LongArrow),
        Op::AtArrow => Ok(BinaryOp::AtArrow),
        other => Err(DbError::UnsupportedOperation(format!(
            "Operator not supported: {}",
            other
        ))),
    }
}

fn is_count_star(expr: &sql_ast::Expr) -> bool {
    matches!(expr, sql_ast::Expr::Function(_))
        && expr.to_string().to_ascii_lowercase().replace(' ', "") == "count(*)"
}

fn extract_table_name(name: &sql_ast::ObjectName) -> Result<String> {
    name.0
        .last()
        .map(|part| part.to_string())
        .ok_or_else(|| DbError::Parse("Empty table name".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(sql: &str) -> Statement {
        SqlParserAdapter::new().parse(sql).unwrap()
    }

    #[test]
    fn test_create_table() {
        let Statement::CreateTable(create) = parse(
            "CREATE TABLE IF NOT EXISTS users (id UUID PRIMARY KEY, attrs JSONB, updated_at TIMESTAMPTZ)",
        ) else {
            panic!("expected CREATE TABLE");
        };

        assert!(create.if_not_exists);
        assert_eq!(create.table_name, "users");
        assert_eq!(create.columns.len(), 3);
        assert!(create.columns[0].primary_key);
        assert_eq!(create.columns[0].data_type, DataType::Uuid);
        assert_eq!(create.columns[1].data_type, DataType::Jsonb);
        assert_eq!(create.columns[2].data_type, DataType::TimestampTz);
    }

    #[test]
    fn test_compiled_filter_shape() {
        let Statement::Query(query) = parse(
            "SELECT attrs FROM users WHERE attrs @> $1::jsonb AND (attrs -> $2::text) IN ($3::jsonb, $4::jsonb) ORDER BY attrs -> $5::text DESC LIMIT $6 OFFSET $7",
        ) else {
            panic!("expected SELECT");
        };

        assert_eq!(query.projection, Projection::Columns(vec!["attrs".into()]));
        let Some(Expr::BinaryOp { op: BinaryOp::And, left, right }) = query.selection else {
            panic!("expected AND");
        };
        assert!(matches!(*left, Expr::BinaryOp { op: BinaryOp::AtArrow, .. }));
        assert!(matches!(*right, Expr::InList { ref list, negated: false, .. } if list.len() == 2));

        assert_eq!(query.order_by.len(), 1);
        assert!(query.order_by[0].descending);
        assert!(query.order_by[0].nulls_first);
        assert_eq!(query.limit, Some(Expr::Placeholder(5)));
        assert_eq!(query.offset, Some(Expr::Placeholder(6)));
    }

    #[test]
    fn test_count_star() {
        let Statement::Query(query) = parse("SELECT count(*) FROM users") else {
            panic!("expected SELECT");
        };
        assert_eq!(query.projection, Projection::CountStar);
        assert!(query.selection.is_none());
    }

    #[test]
    fn test_insert_update_delete() {
        let Statement::Insert(insert) =
            parse("INSERT INTO users (id, attrs, updated_at) VALUES ($1, $2::jsonb, $3), ($4, $5::jsonb, $6)")
        else {
            panic!("expected INSERT");
        };
        assert_eq!(insert.columns, vec!["id", "attrs", "updated_at"]);
        assert_eq!(insert.values.len(), 2);

        let Statement::Update(update) =
            parse("UPDATE users SET attrs = $2::jsonb, updated_at = $3 WHERE id = $1")
        else {
            panic!("expected UPDATE");
        };
        assert_eq!(update.assignments.len(), 2);
        assert_eq!(update.assignments[0].column, "attrs");

        let stmt = parse("DELETE FROM users WHERE id = $1");
        assert_eq!(stmt.kind(), "DELETE");
        assert_eq!(stmt.table_name(), "users");
    }

    #[test]
    fn test_rejects_multiple_statements_and_transaction_control() {
        let adapter = SqlParserAdapter::new();
        assert!(matches!(
            adapter.parse("SELECT attrs FROM a; DELETE FROM a"),
            Err(DbError::Parse(_))
        ));
        assert!(matches!(
            adapter.parse("BEGIN"),
            Err(DbError::UnsupportedOperation(_))
        ));
        assert!(matches!(adapter.parse("SELEC attrs"), Err(DbError::Parse(_))));
    }

    #[test]
    fn test_false_literal() {
        let Statement::Query(query) = parse("SELECT attrs FROM users WHERE FALSE") else {
            panic!("expected SELECT");
        };
        assert_eq!(query.selection, Some(Expr::Literal(Datum::Boolean(false))));
    }
}
