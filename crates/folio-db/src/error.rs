//! # Database Error Types
//!
//! Error types for store operations and the sale workflow.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  CoreError (folio-core)         SQLite Error (sqlx::Error)             │
//! │       │                               │                                 │
//! │       └───────────────┬───────────────┘                                 │
//! │                       ▼                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       │  inside the coordinator's atomic block:                        │
//! │       │  any DbError ──rollback──► TransactionFailed(cause)            │
//! │       │                      └──► RollbackFailed { cause, rollback }   │
//! │       ▼                                                                 │
//! │  Caller (console / GUI) presents the message, never retries            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use folio_core::{CoreError, ValidationError};
use thiserror::Error;

/// Database and workflow errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Input failed a field-level check.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Not enough physical stock.
    #[error("Insufficient stock for book {book_id}: available {available}, requested {requested}")]
    InsufficientStock {
        book_id: i64,
        available: i64,
        requested: i64,
    },

    /// Sale is not in a state that allows the operation.
    #[error("Sale {sale_id} is {current_status}, cannot {operation}")]
    InvalidSaleStatus {
        sale_id: i64,
        current_status: String,
        operation: String,
    },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Registering a second client with the same document number
    /// - Registering a second book with the same ISBN
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Deletion refused because other records still reference the entity.
    ///
    /// ## When This Occurs
    /// - Author still has books
    /// - Client still has sales
    /// - Book appears in a sale line item
    #[error("Cannot delete {entity} {id}: {reason}")]
    DeleteBlocked {
        entity: String,
        id: String,
        reason: String,
    },

    /// The atomic block failed and was rolled back.
    #[error("Transaction failed and was rolled back: {0}")]
    TransactionFailed(#[source] Box<DbError>),

    /// The atomic block failed and the rollback failed too.
    #[error("Transaction failed ({cause}) and rollback also failed: {rollback}")]
    RollbackFailed {
        #[source]
        cause: Box<DbError>,
        rollback: String,
    },

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Creates a DeleteBlocked error.
    pub fn delete_blocked(
        entity: impl Into<String>,
        id: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        DbError::DeleteBlocked {
            entity: entity.into(),
            id: id.to_string(),
            reason: reason.into(),
        }
    }

    /// Uniqueness or referential conflicts.
    pub fn is_integrity_violation(&self) -> bool {
        matches!(
            self,
            DbError::UniqueViolation { .. }
                | DbError::ForeignKeyViolation { .. }
                | DbError::DeleteBlocked { .. }
        )
    }

    /// Failures of the atomic block, whether or not the rollback succeeded.
    pub fn is_transaction_failure(&self) -> bool {
        matches!(
            self,
            DbError::TransactionFailed(_) | DbError::RollbackFailed { .. }
        )
    }

    /// The error that caused a transaction failure, or `self` otherwise.
    pub fn root_cause(&self) -> &DbError {
        match self {
            DbError::TransactionFailed(cause) | DbError::RollbackFailed { cause, .. } => {
                cause.root_cause()
            }
            other => other,
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite error messages for constraints:
                // UNIQUE constraint: "UNIQUE constraint failed: <table>.<column>"
                // FK constraint: "FOREIGN KEY constraint failed"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Lift pure-domain failures into the storage taxonomy.
impl From<CoreError> for DbError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound { entity, id } => DbError::NotFound { entity, id },
            CoreError::InsufficientStock {
                book_id,
                available,
                requested,
                ..
            } => DbError::InsufficientStock {
                book_id,
                available,
                requested,
            },
            CoreError::InvalidSaleStatus {
                sale_id,
                current_status,
                operation,
            } => DbError::InvalidSaleStatus {
                sale_id,
                current_status,
                operation,
            },
            CoreError::Validation(v) => DbError::Validation(v),
            other @ CoreError::ReceiptMismatch { .. } => DbError::Internal(other.to_string()),
        }
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_mapping() {
        let err: DbError = CoreError::InsufficientStock {
            book_id: 3,
            title: "Dune".to_string(),
            available: 5,
            requested: 10,
        }
        .into();
        assert!(matches!(
            err,
            DbError::InsufficientStock {
                book_id: 3,
                available: 5,
                requested: 10
            }
        ));

        let err: DbError = CoreError::Validation(ValidationError::EmptySale).into();
        assert!(matches!(err, DbError::Validation(ValidationError::EmptySale)));
    }

    #[test]
    fn test_root_cause_unwraps_transaction_failures() {
        let err = DbError::RollbackFailed {
            cause: Box::new(DbError::TransactionFailed(Box::new(DbError::not_found(
                "Book", 9,
            )))),
            rollback: "disk I/O error".to_string(),
        };
        assert!(err.is_transaction_failure());
        assert!(matches!(err.root_cause(), DbError::NotFound { .. }));
    }

    #[test]
    fn test_integrity_grouping() {
        assert!(DbError::duplicate("isbn", "123").is_integrity_violation());
        assert!(DbError::delete_blocked("Author", 1, "has books").is_integrity_violation());
        assert!(!DbError::PoolExhausted.is_integrity_violation());
    }
}
