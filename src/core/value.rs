use crate::core::{DbError, Param, Result};
use crate::json;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

/// A single cell value inside the in-memory engine.
///
/// SQL `NULL` and the jsonb value `null` are different things: `attrs -> 'k'`
/// on a document without `k` is `Null`, on `{"k": null}` it is
/// `Json(Value::Null)`.
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    Null,
    Boolean(bool),
    Integer(i64),
    Text(String),
    Json(Value),
    Timestamp(DateTime<Utc>),
}

impl Datum {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Boolean(_) => "BOOLEAN",
            Self::Integer(_) => "BIGINT",
            Self::Text(_) => "TEXT",
            Self::Json(_) => "JSONB",
            Self::Timestamp(_) => "TIMESTAMPTZ",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Three-valued truth: `None` is SQL unknown.
    pub fn truth(&self) -> Result<Option<bool>> {
        match self {
            Self::Null => Ok(None),
            Self::Boolean(b) => Ok(Some(*b)),
            other => Err(DbError::TypeMismatch(format!(
                "argument of boolean operator must be BOOLEAN, not {}",
                other.type_name()
            ))),
        }
    }

    /// SQL comparison; `None` when either side is `NULL`.
    pub fn compare(&self, other: &Datum) -> Result<Option<Ordering>> {
        let ord = match (self, other) {
            (Self::Null, _) | (_, Self::Null) => return Ok(None),
            (Self::Boolean(a), Self::Boolean(b)) => a.cmp(b),
            (Self::Integer(a), Self::Integer(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Json(a), Self::Json(b)) => json::compare(a, b),
            (Self::Timestamp(a), Self::Timestamp(b)) => a.cmp(b),
            _ => {
                return Err(DbError::TypeMismatch(format!(
                    "cannot compare {} with {}",
                    self.type_name(),
                    other.type_name()
                )));
            }
        };
        Ok(Some(ord))
    }

    /// Ordering for `ORDER BY`, where `NULL` sorts after every value.
    pub fn sort_cmp(&self, other: &Datum) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Null, _) => Ordering::Greater,
            (_, Self::Null) => Ordering::Less,
            _ => self
                .compare(other)
                .ok()
                .flatten()
                .unwrap_or_else(|| self.type_name().cmp(other.type_name())),
        }
    }

    /// The JSON form a cell takes in a result [`Row`](crate::Row).
    pub fn into_json(self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Boolean(b) => Value::Bool(b),
            Self::Integer(i) => Value::from(i),
            Self::Text(s) => Value::String(s),
            Self::Json(v) => v,
            Self::Timestamp(ts) => Value::String(ts.to_rfc3339()),
        }
    }

    /// Convert to `ty` the way an explicit `::type` cast does.
    pub fn cast(self, ty: DataType) -> Result<Datum> {
        let mismatch = |d: &Datum| {
            DbError::TypeMismatch(format!("cannot cast {} to {}", d.type_name(), ty))
        };

        match (ty, self) {
            (_, Self::Null) => Ok(Self::Null),
            (DataType::Jsonb, Self::Json(v)) => Ok(Self::Json(v)),
            (DataType::Jsonb, Self::Text(s)) => serde_json::from_str(&s)
                .map(Self::Json)
                .map_err(|e| DbError::TypeMismatch(format!("invalid input syntax for type jsonb: {}", e))),
            (DataType::Jsonb, Self::Integer(i)) => Ok(Self::Json(Value::from(i))),
            (DataType::Jsonb, Self::Boolean(b)) => Ok(Self::Json(Value::Bool(b))),
            (DataType::Text, Self::Json(v)) => Ok(Self::Text(v.to_string())),
            (DataType::Text, Self::Timestamp(ts)) => Ok(Self::Text(ts.to_rfc3339())),
            (DataType::Text, Self::Integer(i)) => Ok(Self::Text(i.to_string())),
            (DataType::Text, Self::Boolean(b)) => Ok(Self::Text(b.to_string())),
            (DataType::Text, Self::Text(s)) => Ok(Self::Text(s)),
            (DataType::Uuid, Self::Text(s)) => uuid::Uuid::parse_str(&s)
                .map(|id| Self::Text(id.hyphenated().to_string()))
                .map_err(|_| DbError::TypeMismatch(format!("invalid input syntax for type uuid: \"{}\"", s))),
            (DataType::BigInt, Self::Integer(i)) => Ok(Self::Integer(i)),
            (DataType::BigInt, Self::Text(s)) => s
                .trim()
                .parse()
                .map(Self::Integer)
                .map_err(|_| DbError::TypeMismatch(format!("invalid input syntax for type bigint: \"{}\"", s))),
            (DataType::BigInt, Self::Json(Value::Number(n))) => n
                .as_i64()
                .map(Self::Integer)
                .ok_or_else(|| DbError::TypeMismatch(format!("cannot cast jsonb numeric {} to bigint", n))),
            (DataType::Boolean, Self::Boolean(b)) => Ok(Self::Boolean(b)),
            (DataType::Boolean, Self::Json(Value::Bool(b))) => Ok(Self::Boolean(b)),
            (DataType::TimestampTz, Self::Timestamp(ts)) => Ok(Self::Timestamp(ts)),
            (DataType::TimestampTz, Self::Text(s)) => DateTime::parse_from_rfc3339(&s)
                .map(|ts| Self::Timestamp(ts.with_timezone(&Utc)))
                .map_err(|_| DbError::TypeMismatch(format!("invalid input syntax for type timestamptz: \"{}\"", s))),
            (_, other) => Err(mismatch(&other)),
        }
    }
}

impl From<&Param> for Datum {
    fn from(param: &Param) -> Self {
        match param {
            Param::Text(s) => Self::Text(s.clone()),
            Param::Json(v) => Self::Json(v.clone()),
            Param::Int(i) => Self::Integer(*i),
            Param::Timestamp(ts) => Self::Timestamp(*ts),
        }
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Text(s) => write!(f, "{}", s),
            Self::Json(v) => write!(f, "{}", v),
            Self::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
        }
    }
}

/// Column and cast target types understood by the in-memory engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Uuid,
    Text,
    Jsonb,
    BigInt,
    Boolean,
    TimestampTz,
}

impl DataType {
    /// Map a SQL type name (`jsonb`, `varchar(20)`, `timestamp with time zone`...).
    pub fn parse(name: &str) -> Result<Self> {
        let upper = name.trim().to_ascii_uppercase();
        let base = upper.split('(').next().unwrap_or_default().trim();
        match base {
            "UUID" => Ok(Self::Uuid),
            "TEXT" | "VARCHAR" | "CHARACTER VARYING" | "CHAR" | "STRING" => Ok(Self::Text),
            "JSONB" | "JSON" => Ok(Self::Jsonb),
            "BIGINT" | "INT8" | "INT" | "INTEGER" | "INT4" => Ok(Self::BigInt),
            "BOOLEAN" | "BOOL" => Ok(Self::Boolean),
            "TIMESTAMPTZ" | "TIMESTAMP WITH TIME ZONE" => Ok(Self::TimestampTz),
            _ => Err(DbError::TypeMismatch(format!("Unsupported data type: {}", name))),
        }
    }

    /// Assignment coercion for INSERT and UPDATE.
    pub fn coerce(&self, value: Datum) -> Result<Datum> {
        match (self, &value) {
            (_, Datum::Null) => Ok(Datum::Null),
            (Self::Text, Datum::Text(_)) => Ok(value),
            (Self::Text, _) => Err(DbError::TypeMismatch(format!(
                "column of type TEXT cannot hold {}",
                value.type_name()
            ))),
            _ => value.cast(*self),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uuid => "UUID",
            Self::Text => "TEXT",
            Self::Jsonb => "JSONB",
            Self::BigInt => "BIGINT",
            Self::Boolean => "BOOLEAN",
            Self::TimestampTz => "TIMESTAMPTZ",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_comparison_is_unknown() {
        assert_eq!(Datum::Null.compare(&Datum::Integer(1)).unwrap(), None);
        assert_eq!(
            Datum::Integer(1).compare(&Datum::Integer(2)).unwrap(),
            Some(Ordering::Less)
        );
        assert!(Datum::Text("a".into()).compare(&Datum::Integer(1)).is_err());
    }

    #[test]
    fn test_sort_puts_null_last() {
        assert_eq!(Datum::Null.sort_cmp(&Datum::Json(json!(1))), Ordering::Greater);
        assert_eq!(Datum::Json(json!(null)).sort_cmp(&Datum::Null), Ordering::Less);
    }

    #[test]
    fn test_casts() {
        let parsed = Datum::Text("{\"a\": 1}".into()).cast(DataType::Jsonb).unwrap();
        assert_eq!(parsed, Datum::Json(json!({"a": 1})));

        let id = Datum::Text("A0EEBC99-9C0B-4EF8-BB6D-6BB9BD380A11".into())
            .cast(DataType::Uuid)
            .unwrap();
        assert_eq!(id, Datum::Text("a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11".into()));

        assert!(Datum::Text("not-a-uuid".into()).cast(DataType::Uuid).is_err());
        assert_eq!(Datum::Json(json!("x")).cast(DataType::Text).unwrap(), Datum::Text("\"x\"".into()));
    }

    #[test]
    fn test_data_type_names() {
        assert_eq!(DataType::parse("jsonb").unwrap(), DataType::Jsonb);
        assert_eq!(DataType::parse("VARCHAR(20)").unwrap(), DataType::Text);
        assert_eq!(DataType::parse("timestamptz").unwrap(), DataType::TimestampTz);
        assert!(DataType::parse("GEOMETRY").is_err());
    }

    #[test]
    fn test_text_column_rejects_json() {
        assert!(DataType::Text.coerce(Datum::Json(json!(1))).is_err());
        assert!(DataType::Jsonb.coerce(Datum::Json(json!(1))).is_ok());
    }
}
