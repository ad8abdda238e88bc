//! # Inventory Adjustment
//!
//! Applies a signed stock delta to a book. Only physical books carry stock;
//! for every other format the adjustment is a no-op, not an error.
//!
//! ## Conditional Update
//! ```text
//! UPDATE books
//!    SET stock = stock + :delta
//!  WHERE id = :id
//!    AND kind = 'physical'
//!    AND stock + :delta >= 0        ← re-checked by the writer itself
//! RETURNING stock
//!
//!  row returned  → Applied { stock }
//!  no row        → look at the book:
//!                    missing        → NotFound
//!                    not physical   → NotPhysical
//!                    physical       → InsufficientStock { available: stock }
//! ```
//!
//! The sale draft already checks stock when a line is added. Running the
//! same check inside the writing statement means two sales racing for the
//! last copy cannot both succeed: SQLite serializes the writers and the
//! second one sees the decremented value.

use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use folio_core::{BookId, BookKind};

/// Result of a stock adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockAdjustment {
    /// Stock changed; `stock` is the new value.
    Applied { book_id: BookId, stock: i64 },
    /// Book exists but has no inventory (digital, audiobook).
    NotPhysical,
}

/// Adds `delta` to the stock of `book_id` on `conn`.
///
/// Runs on whatever connection it is given, so inside a transactional scope
/// the change commits or rolls back with the rest of the block.
///
/// ## Errors
/// - `NotFound` if no book has this id
/// - `InsufficientStock` if the new stock would be negative
pub async fn adjust_stock(
    conn: &mut SqliteConnection,
    book_id: BookId,
    delta: i64,
) -> DbResult<StockAdjustment> {
    let updated: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE books
           SET stock = stock + ?1
         WHERE id = ?2
           AND kind = 'physical'
           AND stock + ?1 >= 0
        RETURNING stock
        "#,
    )
    .bind(delta)
    .bind(book_id)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(stock) = updated {
        debug!(book_id, delta, stock, "Stock adjusted");
        return Ok(StockAdjustment::Applied { book_id, stock });
    }

    let current: Option<(BookKind, Option<i64>)> =
        sqlx::query_as("SELECT kind, stock FROM books WHERE id = ?1")
            .bind(book_id)
            .fetch_optional(&mut *conn)
            .await?;

    match current {
        None => Err(DbError::not_found("Book", book_id)),
        Some((BookKind::Physical, stock)) => {
            let available = stock.unwrap_or(0);
            debug!(book_id, delta, available, "Stock adjustment refused");
            Err(DbError::InsufficientStock {
                book_id,
                available,
                requested: -delta,
            })
        }
        Some((kind, _)) => {
            debug!(book_id, %kind, "No inventory for this format");
            Ok(StockAdjustment::NotPhysical)
        }
    }
}
