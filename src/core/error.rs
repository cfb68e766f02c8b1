use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    /// A filter constraint could not be encoded into a predicate.
    #[error("filter compilation failed: {0}")]
    Encoding(String),

    /// The materializer was handed something that is not a growable ordered container.
    #[error("invalid decode destination: {0}")]
    InvalidDestination(String),

    /// A result row did not match the shape of the destination element.
    #[error("row decoding failed: {0}")]
    Decode(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Table '{0}' already exists")]
    TableExists(String),

    #[error("Table '{0}' not found")]
    TableNotFound(String),

    #[error("Column '{0}' not found in table '{1}'")]
    ColumnNotFound(String, String),

    #[error("Invalid identifier '{0}'")]
    InvalidIdentifier(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[cfg(feature = "postgres")]
    #[error("Postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),
}

pub type Result<T> = std::result::Result<T, DbError>;

impl DbError {
    /// Which stage of the pipeline produced the error.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Encoding(_) => "compilation",
            Self::InvalidDestination(_) => "destination validation",
            Self::Decode(_) => "decoding",
            Self::Config(_) | Self::InvalidIdentifier(_) => "configuration",
            Self::Transaction(_) => "transaction",
            _ => "execution",
        }
    }
}

impl From<sqlparser::parser::ParserError> for DbError {
    fn from(err: sqlparser::parser::ParserError) -> Self {
        Self::Parse(err.to_string())
    }
}
