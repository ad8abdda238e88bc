//! # Transactional Scope
//!
//! A database transaction bounded to one atomic block of the sale workflow.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  TxScope::begin(pool)          BEGIN  (pins one pooled connection)     │
//! │       │                                                                 │
//! │       ├── scope.conn() ──► line_item::insert(conn, ..)                 │
//! │       ├── scope.conn() ──► inventory::adjust_stock(conn, ..)           │
//! │       └── scope.conn() ──► sale::mark_completed(conn, ..)              │
//! │       │                                                                 │
//! │  scope.finish(result)                                                   │
//! │       ├── Ok(v)   → COMMIT    → Ok(v)                                   │
//! │       └── Err(e)  → ROLLBACK  → TransactionFailed(e)                    │
//! │                       └─ fails → RollbackFailed { cause: e, .. }        │
//! │                                                                         │
//! │  Dropped without finish → sqlx rolls back on drop                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Only the sale coordinator opens scopes. Stores expose connection-level
//! functions so they can run inside one.

use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use tracing::{debug, error};

use crate::error::{DbError, DbResult};

/// An open transaction.
#[derive(Debug)]
pub struct TxScope {
    tx: Transaction<'static, Sqlite>,
}

impl TxScope {
    /// Opens a scope on a connection from `pool`.
    pub async fn begin(pool: &SqlitePool) -> DbResult<Self> {
        let tx = pool.begin().await?;
        debug!("Transaction scope opened");
        Ok(TxScope { tx })
    }

    /// The connection every statement of this scope must run on.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut *self.tx
    }

    /// Commits on success, rolls back on failure.
    ///
    /// A failure inside the block (or of the commit itself) is returned as
    /// `TransactionFailed`. If the rollback fails as well the result is
    /// `RollbackFailed`, still carrying the original cause.
    pub async fn finish<T>(self, result: DbResult<T>) -> DbResult<T> {
        match result {
            Ok(value) => match self.tx.commit().await {
                Ok(()) => {
                    debug!("Transaction scope committed");
                    Ok(value)
                }
                // A failed COMMIT leaves nothing applied.
                Err(e) => Err(DbError::TransactionFailed(Box::new(e.into()))),
            },
            Err(cause) => match self.tx.rollback().await {
                Ok(()) => {
                    debug!(error = %cause, "Transaction scope rolled back");
                    Err(DbError::TransactionFailed(Box::new(cause)))
                }
                Err(rollback) => {
                    error!(
                        error = %cause,
                        rollback_error = %rollback,
                        "Rollback failed after transaction error"
                    );
                    Err(DbError::RollbackFailed {
                        cause: Box::new(cause),
                        rollback: rollback.to_string(),
                    })
                }
            },
        }
    }
}
