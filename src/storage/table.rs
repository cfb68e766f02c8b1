use crate::core::{Datum, DbError, Result};
use crate::parser::ast::ColumnDef;
use im::{HashSet, Vector};

#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    name: String,
    columns: Vec<ColumnDef>,
    primary_key: Option<usize>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDef>) -> Result<Self> {
        let name = name.into();
        if columns.is_empty() {
            return Err(DbError::Execution(format!("table '{}' needs at least one column", name)));
        }
        for (i, column) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.name == column.name) {
                return Err(DbError::Execution(format!(
                    "column '{}' specified more than once",
                    column.name
                )));
            }
        }
        let primary_key = columns.iter().position(|c| c.primary_key);

        Ok(Self {
            name,
            columns,
            primary_key,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn find_column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.find_column_index(name)
            .ok_or_else(|| DbError::ColumnNotFound(name.to_string(), self.name.clone()))
    }

    /// Coerce a full row to the column types and check NOT NULL.
    pub fn validate_row(&self, row: Vec<Datum>) -> Result<Vec<Datum>> {
        if row.len() != self.columns.len() {
            return Err(DbError::Execution(format!(
                "table '{}' has {} columns but {} values were supplied",
                self.name,
                self.columns.len(),
                row.len()
            )));
        }

        self.columns
            .iter()
            .zip(row)
            .map(|(column, value)| {
                let value = column.data_type.coerce(value).map_err(|e| match e {
                    DbError::TypeMismatch(msg) => {
                        DbError::TypeMismatch(format!("column '{}': {}", column.name, msg))
                    }
                    other => other,
                })?;
                if value.is_null() && !column.nullable {
                    return Err(DbError::ConstraintViolation(format!(
                        "null value in column '{}' of table '{}'",
                        column.name, self.name
                    )));
                }
                Ok(value)
            })
            .collect()
    }
}

/// Rows of one table plus a version that moves on every mutation.
///
/// Backed by persistent collections, so cloning a table (or the catalog
/// holding it) is cheap and clones evolve independently.
#[derive(Debug, Clone)]
pub struct Table {
    schema: TableSchema,
    rows: Vector<Vec<Datum>>,
    keys: HashSet<String>,
    version: u64,
}

impl Table {
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            rows: Vector::new(),
            keys: HashSet::new(),
            version: 0,
        }
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = &Vec<Datum>> {
        self.rows.iter()
    }

    fn key_of(&self, row: &[Datum]) -> Option<String> {
        self.schema.primary_key.map(|pk| row[pk].to_string())
    }

    pub fn insert(&mut self, row: Vec<Datum>) -> Result<()> {
        let row = self.schema.validate_row(row)?;
        if let Some(key) = self.key_of(&row) {
            if self.keys.contains(&key) {
                return Err(self.duplicate_key(&key));
            }
            self.keys.insert(key);
        }
        self.rows.push_back(row);
        self.version += 1;
        Ok(())
    }

    /// Replace the row at `index`.
    pub fn update(&mut self, index: usize, row: Vec<Datum>) -> Result<()> {
        let row = self.schema.validate_row(row)?;
        let old_key = self.rows.get(index).and_then(|old| self.key_of(old));
        let new_key = self.key_of(&row);

        if new_key != old_key {
            if let Some(key) = &new_key
                && self.keys.contains(key)
            {
                return Err(self.duplicate_key(key));
            }
            if let Some(key) = old_key {
                self.keys.remove(&key);
            }
            if let Some(key) = new_key {
                self.keys.insert(key);
            }
        }

        self.rows.set(index, row);
        self.version += 1;
        Ok(())
    }

    /// Remove the rows at the given ascending indexes.
    pub fn delete(&mut self, indexes: &[usize]) -> usize {
        for &index in indexes.iter().rev() {
            let row = self.rows.remove(index);
            if let Some(key) = self.key_of(&row) {
                self.keys.remove(&key);
            }
        }
        if !indexes.is_empty() {
            self.version += 1;
        }
        indexes.len()
    }

    fn duplicate_key(&self, key: &str) -> DbError {
        DbError::ConstraintViolation(format!(
            "duplicate key value violates primary key of '{}': {}",
            self.schema.name, key
        ))
    }
}
