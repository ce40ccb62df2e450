// Central Error Type for the Application

use thiserror::Error;

/// Boxed error raised by a user-supplied migration routine
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    /// A transaction was already open when the operator tried to start its own
    #[error("Nested transaction: a transaction is already open on this connection")]
    NestedTransaction,

    /// The operator answered "no" at the commit prompt
    #[error("Canceled: {0}")]
    Canceled(String),

    #[error("Migration failed: {0}")]
    Migration(#[source] BoxError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl AppError {
    /// Wrap an arbitrary routine error
    pub fn migration(err: impl Into<BoxError>) -> Self {
        AppError::Migration(err.into())
    }

    /// True when the run ended because the operator declined to commit
    pub fn is_canceled(&self) -> bool {
        matches!(self, AppError::Canceled(_))
    }

    pub fn is_nested_transaction(&self) -> bool {
        matches!(self, AppError::NestedTransaction)
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

// Note: sqlx::Error conversion is handled in infra-sqlite crate
// by converting to AppError::Database(String)
