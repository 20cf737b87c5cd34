use thiserror::Error;

/// Errors that can occur when interacting with the backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The targeted row does not exist.
    #[error("row not found in {table}")]
    NotFound { table: &'static str },

    /// A uniqueness or foreign-key constraint was violated.
    #[error("constraint violation: {constraint}")]
    Constraint { constraint: String },

    /// A stored value could not be decoded into its domain type.
    #[error("corrupt {column} value: {message}")]
    Decode {
        column: &'static str,
        message: String,
    },

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
