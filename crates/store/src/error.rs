use thiserror::Error;

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A unique constraint rejected the write.
    #[error("Duplicate value violates {constraint}")]
    UniqueViolation { constraint: String },

    /// The row is still referenced by other records and cannot be deleted.
    #[error("{entity} {id} is still referenced")]
    Referenced { entity: &'static str, id: String },

    /// A stored value could not be decoded.
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn unique(constraint: impl Into<String>) -> Self {
        StoreError::UniqueViolation {
            constraint: constraint.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            StoreError::UniqueViolation { .. } => "duplicate",
            StoreError::Referenced { .. } => "referenced",
            _ => "storage_error",
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
