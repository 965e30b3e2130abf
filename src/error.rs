use thiserror::Error;

#[derive(Error, Debug)]
pub enum FieldrefError {
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("Malformed row {row:?}: {message}")]
    MalformedRow { row: Option<i64>, message: String },
    #[error("Unsupported search criterion: {0}")]
    UnsupportedCriterion(String),
    #[error("Query timed out after {elapsed_ms} ms")]
    QueryTimeout { elapsed_ms: u128 },
    #[error("Search cancelled")]
    Cancelled,
    #[error("Config error: {0}")]
    Config(String),
    #[error("Query error: {0}")]
    Query(String),
}

pub type Result<T> = std::result::Result<T, FieldrefError>;

// Helper conversions
impl From<rusqlite::Error> for FieldrefError {
    fn from(e: rusqlite::Error) -> Self {
        match e {
            rusqlite::Error::InvalidColumnType(..)
            | rusqlite::Error::InvalidColumnIndex(_)
            | rusqlite::Error::InvalidColumnName(_)
            | rusqlite::Error::FromSqlConversionFailure(..)
            | rusqlite::Error::IntegralValueOutOfRange(..) => Self::MalformedRow {
                row: None,
                message: e.to_string(),
            },
            _ => Self::Query(e.to_string()),
        }
    }
}

impl From<config::ConfigError> for FieldrefError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}
