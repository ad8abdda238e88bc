//! # Sale Repository
//!
//! Database operations for sale headers.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. BEGIN                                                              │
//! │     └── insert_pending() → Sale { status: Pending, total: 0 }          │
//! │                                                                         │
//! │  2. COLLECT LINES (in memory, SaleDraft)                               │
//! │                                                                         │
//! │  3. COMPLETE (inside the coordinator's scope)                          │
//! │     └── mark_completed() → Sale { status: Completed, total, paid by }  │
//! │         guarded by status = 'pending'                                   │
//! │                                                                         │
//! │  4. (OPTIONAL) CANCEL or DELETE                                        │
//! │     └── set_status(.., Cancelled)  /  delete()                         │
//! │                                                                         │
//! │  Abandoned pending headers are removed by purge_pending_before().      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use folio_core::{ClientId, Money, PaymentMethod, Sale, SaleId, SaleStatus};

const SALE_COLUMNS: &str =
    "id, client_id, created_at, total_cents, payment_method, status, completed_at";

// =============================================================================
// Connection-level Operations
// =============================================================================

pub async fn insert_pending(
    conn: &mut SqliteConnection,
    client_id: ClientId,
    created_at: DateTime<Utc>,
) -> DbResult<Sale> {
    debug!(client_id, "Inserting pending sale");

    let sale = Sale {
        id: 0,
        client_id,
        created_at,
        total_cents: 0,
        payment_method: PaymentMethod::default(),
        status: SaleStatus::Pending,
        completed_at: None,
    };

    let result = sqlx::query(
        r#"
        INSERT INTO sales (client_id, created_at, total_cents, payment_method, status, completed_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(sale.client_id)
    .bind(sale.created_at)
    .bind(sale.total_cents)
    .bind(sale.payment_method)
    .bind(sale.status)
    .bind(sale.completed_at)
    .execute(conn)
    .await?;

    Ok(Sale {
        id: result.last_insert_rowid(),
        ..sale
    })
}

pub async fn get_by_id(conn: &mut SqliteConnection, id: SaleId) -> DbResult<Option<Sale>> {
    let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1");
    let sale = sqlx::query_as::<_, Sale>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?;

    Ok(sale)
}

/// Pending → Completed, recording total, payment method and completion time.
///
/// ## Errors
/// - `NotFound` if the sale doesn't exist
/// - `InvalidSaleStatus` if it is no longer Pending
pub async fn mark_completed(
    conn: &mut SqliteConnection,
    id: SaleId,
    total: Money,
    payment_method: PaymentMethod,
    completed_at: DateTime<Utc>,
) -> DbResult<Sale> {
    debug!(id, total = %total, %payment_method, "Completing sale");

    let sql = format!(
        r#"
        UPDATE sales
           SET total_cents = ?1, payment_method = ?2, status = ?3, completed_at = ?4
         WHERE id = ?5 AND status = ?6
        RETURNING {SALE_COLUMNS}
        "#
    );
    let updated = sqlx::query_as::<_, Sale>(&sql)
        .bind(total.cents())
        .bind(payment_method)
        .bind(SaleStatus::Completed)
        .bind(completed_at)
        .bind(id)
        .bind(SaleStatus::Pending)
        .fetch_optional(&mut *conn)
        .await?;

    match updated {
        Some(sale) => Ok(sale),
        None => Err(status_conflict(conn, id, "complete").await),
    }
}

/// Moves a sale from `from` to `to`. Fails if the stored status is not
/// `from`.
pub async fn set_status(
    conn: &mut SqliteConnection,
    id: SaleId,
    from: SaleStatus,
    to: SaleStatus,
) -> DbResult<Sale> {
    debug!(id, %from, %to, "Changing sale status");

    let sql = format!(
        "UPDATE sales SET status = ?1 WHERE id = ?2 AND status = ?3 RETURNING {SALE_COLUMNS}"
    );
    let updated = sqlx::query_as::<_, Sale>(&sql)
        .bind(to)
        .bind(id)
        .bind(from)
        .fetch_optional(&mut *conn)
        .await?;

    match updated {
        Some(sale) => Ok(sale),
        None => Err(status_conflict(conn, id, &format!("change to {to}")).await),
    }
}

/// Deletes a sale header. Its lines go with it (`ON DELETE CASCADE`).
pub async fn delete(conn: &mut SqliteConnection, id: SaleId) -> DbResult<()> {
    debug!(id, "Deleting sale");

    let result = sqlx::query("DELETE FROM sales WHERE id = ?1")
        .bind(id)
        .execute(conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Sale", id));
    }
    Ok(())
}

/// Deletes Pending sales created before `cutoff`. Returns how many.
pub async fn purge_pending_before(
    conn: &mut SqliteConnection,
    cutoff: DateTime<Utc>,
) -> DbResult<u64> {
    let result = sqlx::query("DELETE FROM sales WHERE status = ?1 AND created_at < ?2")
        .bind(SaleStatus::Pending)
        .bind(cutoff)
        .execute(conn)
        .await?;

    debug!(%cutoff, purged = result.rows_affected(), "Purged stale pending sales");
    Ok(result.rows_affected())
}

/// Explains why a status-guarded update touched nothing.
async fn status_conflict(conn: &mut SqliteConnection, id: SaleId, operation: &str) -> DbError {
    match get_by_id(conn, id).await {
        Ok(Some(sale)) => DbError::InvalidSaleStatus {
            sale_id: id,
            current_status: sale.status.to_string(),
            operation: operation.to_string(),
        },
        Ok(None) => DbError::not_found("Sale", id),
        Err(e) => e,
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for sale headers.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Persists a Pending header stamped now.
    pub async fn insert_pending(&self, client_id: ClientId) -> DbResult<Sale> {
        let mut conn = self.pool.acquire().await?;
        insert_pending(&mut conn, client_id, Utc::now()).await
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: SaleId) -> DbResult<Option<Sale>> {
        let mut conn = self.pool.acquire().await?;
        get_by_id(&mut conn, id).await
    }

    /// All sales, newest first.
    pub async fn list(&self) -> DbResult<Vec<Sale>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM sales ORDER BY created_at DESC, id DESC");
        let sales = sqlx::query_as::<_, Sale>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(sales)
    }

    /// Sales of one client, newest first.
    pub async fn list_by_client(&self, client_id: ClientId) -> DbResult<Vec<Sale>> {
        let sql = format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE client_id = ?1 ORDER BY created_at DESC, id DESC"
        );
        let sales = sqlx::query_as::<_, Sale>(&sql)
            .bind(client_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(sales)
    }

    /// Sales in one status, oldest first.
    pub async fn list_by_status(&self, status: SaleStatus) -> DbResult<Vec<Sale>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE status = ?1 ORDER BY created_at, id");
        let sales = sqlx::query_as::<_, Sale>(&sql)
            .bind(status)
            .fetch_all(&self.pool)
            .await?;

        Ok(sales)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
