//! Store error type

use sd_core::error::SdError;

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The record changed since it was read (stale `lock_version`)
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("{field} already exists: {value}")]
    Duplicate { field: &'static str, value: String },

    #[error("Not enough quantity for tool \"{tool}\". Available: {available}, Requested: {requested}")]
    InsufficientStock {
        tool: String,
        available: i64,
        requested: i64,
    },

    /// Stock taken from a tool that is no longer active
    #[error("Tool \"{0}\" is inactive")]
    Inactive(String),
}

/// Result type for store operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

impl RepositoryError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        RepositoryError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn stale(entity: &str, id: impl std::fmt::Display) -> Self {
        RepositoryError::Conflict(format!("{} {} was modified concurrently", entity, id))
    }
}

impl From<RepositoryError> for SdError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => SdError::NotFound { entity, id },
            RepositoryError::Conflict(message) => SdError::Conflict { message },
            RepositoryError::Duplicate { field, .. } => SdError::invalid(field, "already exists"),
            RepositoryError::InsufficientStock {
                tool,
                available,
                requested,
            } => SdError::InsufficientStock {
                tool,
                available,
                requested,
            },
            RepositoryError::Inactive(tool) => {
                SdError::invalid_transition(format!("Tool \"{}\" is inactive", tool))
            }
            RepositoryError::Database(e) => SdError::Database(e.to_string()),
            RepositoryError::Serialization(e) => SdError::Internal(e.to_string()),
        }
    }
}
