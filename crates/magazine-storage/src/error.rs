use std::collections::BTreeMap;

/// Field name -> human readable messages, as returned in 422 responses.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Errors that can occur within the storage layer.
///
/// # Examples
///
/// ```rust
/// use magazine_storage::error::StorageError;
///
/// let err = StorageError::NotFound {
///     entity: "rewritten_article",
///     id: "42".to_string(),
/// };
/// assert!(err.to_string().contains("rewritten_article"));
///
/// let err = StorageError::field("slug", "has already been taken");
/// assert!(matches!(err, StorageError::Validation(_)));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A required record was not found (or is soft-deleted).
    #[error("Storage: {entity} not found (id={id})")]
    NotFound { entity: &'static str, id: String },

    /// Input rejected by a store-level rule such as slug uniqueness.
    #[error("Storage: validation failed: {0:?}")]
    Validation(FieldErrors),

    /// The request conflicts with the current state of the record.
    #[error("Storage: conflict: {0}")]
    Conflict(String),

    /// A status transition that the lifecycle does not allow.
    #[error("Storage: {entity} cannot move from {from} to {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    /// An underlying database error.
    #[error("Storage: database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// JSON serialization or deserialization failure (e.g. all_articles column).
    #[error("Storage: JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage: I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Password hashing or secret encryption failure.
    #[error("Storage: crypto error: {0}")]
    Crypto(String),

    /// A column contained a value outside its closed set.
    #[error("Storage: unexpected value in column '{column}': {value}")]
    UnexpectedValue { column: &'static str, value: String },

    /// Generic storage error for cases not covered by other variants.
    #[error("Storage: {0}")]
    Other(String),
}

impl StorageError {
    /// Single-field validation error.
    pub fn field(field: &str, message: &str) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec![message.to_string()]);
        Self::Validation(errors)
    }

    pub fn not_found(entity: &'static str, id: &str) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<bcrypt::BcryptError> for StorageError {
    fn from(e: bcrypt::BcryptError) -> Self {
        Self::Crypto(e.to_string())
    }
}

/// Convenience `Result` alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
