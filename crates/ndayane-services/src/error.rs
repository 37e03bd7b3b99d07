//! # Service Error Type
//!
//! The one error type callers of the services see.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Ndayane POS                            │
//! │                                                                         │
//! │  ValidationError ──► CoreError ──┐                                      │
//! │                                  ├──► ServiceError { code, message }    │
//! │  sqlx::Error ──────► DbError ────┘                                      │
//! │                                                                         │
//! │  code                 when                                              │
//! │  ───────────────────  ───────────────────────────────────────────────── │
//! │  NOT_FOUND            sale, client, product, warehouse, stock row ...   │
//! │  VALIDATION_ERROR     malformed input, duplicate reference/username     │
//! │  BUSINESS_RULE        status precondition, insufficient credit,         │
//! │                       discount > subtotal, inactive product/user        │
//! │  DATABASE_ERROR       storage failure (details logged, not returned)    │
//! │  CONFIGURATION_ERROR  unreadable or invalid config file                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Serialization
//! ```json
//! { "code": "NOT_FOUND", "message": "Sale not found: 6f1c..." }
//! ```

use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;

use ndayane_core::{CoreError, ValidationError};
use ndayane_db::DbError;

/// Error returned by every service operation.
#[derive(Debug, Clone, Serialize, Error, TS)]
#[error("{message}")]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ServiceError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for service responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// The shop's rules refuse the request (422)
    BusinessRule,

    /// Database operation failed (500)
    DatabaseError,

    /// Configuration could not be loaded
    ConfigurationError,
}

impl ServiceError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ServiceError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ServiceError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::new(ErrorCode::ValidationError, message)
    }

    pub fn business(message: impl Into<String>) -> Self {
        ServiceError::new(ErrorCode::BusinessRule, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        ServiceError::new(ErrorCode::ConfigurationError, message)
    }

    pub fn is_not_found(&self) -> bool {
        self.code == ErrorCode::NotFound
    }
}

/// Converts database errors to service errors.
impl From<DbError> for ServiceError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ServiceError::not_found(&entity, &id),
            DbError::UniqueViolation { field, .. } => {
                ServiceError::validation(format!("{} already exists", field))
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ServiceError::validation("Invalid reference")
            }
            DbError::CheckViolation { message } => {
                tracing::error!("Check constraint violation: {}", message);
                ServiceError::validation("Value rejected by the database")
            }
            DbError::Conflict(message) => ServiceError::business(message),
            DbError::ConnectionFailed(_) => {
                ServiceError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(e) => {
                tracing::error!("Migration failed: {}", e);
                ServiceError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                ServiceError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::PoolExhausted => {
                ServiceError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ServiceError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Transaction begin/commit return raw sqlx errors.
impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        ServiceError::from(DbError::from(err))
    }
}

/// Converts core errors to service errors.
impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ProductNotFound(id) => ServiceError::not_found("Product", &id),
            CoreError::Validation(e) => ServiceError::validation(e.to_string()),
            CoreError::EmptySale | CoreError::EmptyOrder | CoreError::TooManyLines { .. } => {
                ServiceError::validation(err.to_string())
            }
            other => ServiceError::business(other.to_string()),
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::validation(err.to_string())
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(err: std::io::Error) -> Self {
        ServiceError::config(format!("Cannot read config file: {}", err))
    }
}

impl From<toml::de::Error> for ServiceError {
    fn from(err: toml::de::Error) -> Self {
        ServiceError::config(format!("Invalid config file: {}", err))
    }
}

impl From<toml::ser::Error> for ServiceError {
    fn from(err: toml::ser::Error) -> Self {
        ServiceError::config(format!("Cannot serialize config: {}", err))
    }
}

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;
