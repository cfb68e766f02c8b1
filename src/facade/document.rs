use crate::core::{DbError, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A stored document: identifier, attribute payload, last-modified time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub attrs: Value,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Document {
    pub fn new<T: Serialize + ?Sized>(id: impl Into<String>, attrs: &T) -> Result<Self> {
        Ok(Self {
            id: id.into(),
            attrs: encode(attrs)?,
            updated_at: None,
        })
    }

    /// A document with a fresh UUID v4 identifier.
    pub fn with_new_id<T: Serialize + ?Sized>(attrs: &T) -> Result<Self> {
        Self::new(uuid::Uuid::new_v4().to_string(), attrs)
    }

    pub fn updated_at(mut self, ts: DateTime<Utc>) -> Self {
        self.updated_at = Some(ts);
        self
    }

    /// Decode the attribute payload into `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        T::deserialize(&self.attrs).map_err(|e| DbError::Decode(e.to_string()))
    }
}

pub(crate) fn encode<T: Serialize + ?Sized>(attrs: &T) -> Result<Value> {
    serde_json::to_value(attrs).map_err(|e| DbError::Encoding(format!("document attributes: {}", e)))
}
