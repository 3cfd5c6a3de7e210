use thiserror::Error;
use thyro_core::errors::{DatabaseError, Error};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(#[from] diesel::ConnectionError),

    #[error("Connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("Query failed: {0}")]
    QueryFailed(#[from] diesel::result::Error),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt row: {0}")]
    CorruptRow(String),
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        let db_err = match err {
            StorageError::ConnectionFailed(e) => DatabaseError::ConnectionFailed(e.to_string()),
            StorageError::Pool(e) => DatabaseError::ConnectionFailed(e.to_string()),
            StorageError::QueryFailed(e) => DatabaseError::QueryFailed(e.to_string()),
            StorageError::MigrationFailed(e) => DatabaseError::MigrationFailed(e),
            StorageError::Io(e) => DatabaseError::Internal(e.to_string()),
            StorageError::CorruptRow(e) => DatabaseError::Internal(e),
        };
        Error::Database(db_err)
    }
}
