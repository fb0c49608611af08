/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Transport-level store failures. Rejections of a specific write are not
/// errors; they come back as a non-success `UpsertResponse`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Connection, pool, timeout and I/O failures. Serialization and
    /// migration failures are bugs or schema drift and are not retried.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Database(_) | StoreError::Io(_) | StoreError::Unavailable(_) => true,
            StoreError::Migrate(_) | StoreError::Serialization(_) => false,
        }
    }
}
