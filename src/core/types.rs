use crate::core::{DbError, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").unwrap();
}

/// SQL type of a document table's `id` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PkType {
    #[default]
    Uuid,
    Text,
}

impl PkType {
    pub fn sql(&self) -> &'static str {
        match self {
            Self::Uuid => "UUID",
            Self::Text => "TEXT",
        }
    }
}

impl fmt::Display for PkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql())
    }
}

impl FromStr for PkType {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "UUID" => Ok(Self::Uuid),
            "TEXT" => Ok(Self::Text),
            other => Err(DbError::Config(format!("unknown primary key type '{}'", other))),
        }
    }
}

/// Table names are the only caller text interpolated into statements, so
/// they must be plain SQL identifiers.
pub fn validate_identifier(name: &str) -> Result<()> {
    if IDENTIFIER.is_match(name) {
        Ok(())
    } else {
        Err(DbError::InvalidIdentifier(name.to_string()))
    }
}
