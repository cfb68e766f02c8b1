use super::{Table, TableSchema};
use crate::core::{DbError, Result};
use im::HashMap;

/// All tables of one database state.
///
/// Cloning is O(1): a transaction's snapshot is just a clone, and writes to
/// either copy never show through to the other.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tables: HashMap<String, Table>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the table already existed and `if_not_exists` was set.
    pub fn create_table(&mut self, schema: TableSchema, if_not_exists: bool) -> Result<bool> {
        let name = schema.name().to_string();

        if self.contains(&name) {
            return if if_not_exists {
                Ok(false)
            } else {
                Err(DbError::TableExists(name))
            };
        }

        self.tables.insert(name, Table::new(schema));
        Ok(true)
    }

    pub fn get(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| DbError::TableNotFound(name.to_string()))
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| DbError::TableNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Version of `name`, `None` when the table does not exist.
    pub fn version_of(&self, name: &str) -> Option<u64> {
        self.tables.get(name).map(Table::version)
    }

    /// Copy `name` from `other` into this catalog, replacing any existing table.
    pub fn adopt(&mut self, other: &Catalog, name: &str) {
        match other.tables.get(name) {
            Some(table) => {
                self.tables.insert(name.to_string(), table.clone());
            }
            None => {
                self.tables.remove(name);
            }
        }
    }

    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.keys().cloned().collect();
        names.sort();
        names
    }
}
