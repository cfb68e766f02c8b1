use chrono::{DateTime, Utc};
use std::fmt;

/// A value bound to a `$n` placeholder.
///
/// Caller data never reaches statement text directly: the filter compiler,
/// the query modifiers and the table operations all emit placeholders and
/// push the matching `Param` here, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Text(String),
    Json(serde_json::Value),
    Int(i64),
    Timestamp(DateTime<Utc>),
}

impl Param {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Text(_) => "TEXT",
            Self::Json(_) => "JSONB",
            Self::Int(_) => "BIGINT",
            Self::Timestamp(_) => "TIMESTAMPTZ",
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{}", s),
            Self::Json(v) => write!(f, "{}", v),
            Self::Int(i) => write!(f, "{}", i),
            Self::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
        }
    }
}

impl From<&str> for Param {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Param {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<serde_json::Value> for Param {
    fn from(v: serde_json::Value) -> Self {
        Self::Json(v)
    }
}

impl From<i64> for Param {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<DateTime<Utc>> for Param {
    fn from(ts: DateTime<Utc>) -> Self {
        Self::Timestamp(ts)
    }
}
