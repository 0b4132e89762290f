use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Trade file I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Trade serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<StoreError> for common::Error {
    fn from(err: StoreError) -> Self {
        common::Error::DbError(err.to_string())
    }
}
