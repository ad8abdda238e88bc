//! # Line-Item Ledger
//!
//! Persisted lines of sales. Writes take a connection so the coordinator can
//! run them inside its transactional scope; the repository only wraps reads
//! and the single-line delete.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use folio_core::{BookId, LineItemId, Money, SaleId, SaleLineItem, SaleStatus};

const LINE_COLUMNS: &str = "id, sale_id, book_id, quantity, unit_price_cents, subtotal_cents";

/// Persists one line. The subtotal is computed from quantity and the unit
/// price snapshot.
pub async fn insert(
    conn: &mut SqliteConnection,
    sale_id: SaleId,
    book_id: BookId,
    quantity: i64,
    unit_price: Money,
) -> DbResult<SaleLineItem> {
    // Validates quantity and derives the subtotal before anything is written.
    let pending = SaleLineItem::new(0, sale_id, book_id, quantity, unit_price)?;

    debug!(sale_id, book_id, quantity, "Inserting sale line");

    let result = sqlx::query(
        r#"
        INSERT INTO sale_line_items (sale_id, book_id, quantity, unit_price_cents, subtotal_cents)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(sale_id)
    .bind(book_id)
    .bind(pending.quantity())
    .bind(pending.unit_price().cents())
    .bind(pending.subtotal().cents())
    .execute(conn)
    .await?;

    Ok(SaleLineItem::new(
        result.last_insert_rowid(),
        sale_id,
        book_id,
        quantity,
        unit_price,
    )?)
}

/// Removes one line of a Pending or Cancelled sale.
///
/// Lines of a Completed sale are refused; undo such a sale through the
/// coordinator.
///
/// ## Errors
/// - `NotFound` if no line has this id
/// - `InvalidSaleStatus` if the line belongs to a Completed sale
pub async fn delete_by_id(conn: &mut SqliteConnection, id: LineItemId) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        DELETE FROM sale_line_items
        WHERE id = ?1
          AND sale_id IN (SELECT id FROM sales WHERE status != 'completed')
        "#,
    )
    .bind(id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() > 0 {
        debug!(line_item_id = id, "Deleted sale line");
        return Ok(());
    }

    // Nothing deleted: tell a missing line from a protected one.
    let owner: Option<(SaleId, SaleStatus)> = sqlx::query_as(
        r#"
        SELECT s.id, s.status
        FROM sale_line_items li
        JOIN sales s ON s.id = li.sale_id
        WHERE li.id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    match owner {
        None => Err(DbError::not_found("SaleLineItem", id)),
        Some((sale_id, status)) => Err(DbError::InvalidSaleStatus {
            sale_id,
            current_status: status.to_string(),
            operation: "delete line".to_string(),
        }),
    }
}

/// Removes every line of a sale. Returns how many were removed.
pub async fn delete_for_sale(conn: &mut SqliteConnection, sale_id: SaleId) -> DbResult<u64> {
    let result = sqlx::query("DELETE FROM sale_line_items WHERE sale_id = ?1")
        .bind(sale_id)
        .execute(conn)
        .await?;

    debug!(sale_id, removed = result.rows_affected(), "Deleted sale lines");
    Ok(result.rows_affected())
}

/// Lines of a sale in insertion order.
pub async fn list_by_sale(
    conn: &mut SqliteConnection,
    sale_id: SaleId,
) -> DbResult<Vec<SaleLineItem>> {
    let sql = format!("SELECT {LINE_COLUMNS} FROM sale_line_items WHERE sale_id = ?1 ORDER BY id");
    let items = sqlx::query_as::<_, SaleLineItem>(&sql)
        .bind(sale_id)
        .fetch_all(conn)
        .await?;

    Ok(items)
}

/// Sum of line subtotals in cents; `0` for a sale without lines.
pub async fn sum_subtotals_for_sale(conn: &mut SqliteConnection, sale_id: SaleId) -> DbResult<i64> {
    let total: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(subtotal_cents), 0) FROM sale_line_items WHERE sale_id = ?1",
    )
    .bind(sale_id)
    .fetch_one(conn)
    .await?;

    Ok(total)
}

/// Read access to the ledger.
#[derive(Debug, Clone)]
pub struct LineItemRepository {
    pool: SqlitePool,
}

impl LineItemRepository {
    /// Creates a new LineItemRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LineItemRepository { pool }
    }

    pub async fn list_by_sale(&self, sale_id: SaleId) -> DbResult<Vec<SaleLineItem>> {
        let mut conn = self.pool.acquire().await?;
        list_by_sale(&mut conn, sale_id).await
    }

    /// See [`delete_by_id`].
    pub async fn delete_by_id(&self, id: LineItemId) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        delete_by_id(&mut conn, id).await
    }

    /// Every line that sold `book_id`, oldest first.
    pub async fn list_by_book(&self, book_id: BookId) -> DbResult<Vec<SaleLineItem>> {
        let sql = format!("SELECT {LINE_COLUMNS} FROM sale_line_items WHERE book_id = ?1 ORDER BY id");
        let items = sqlx::query_as::<_, SaleLineItem>(&sql)
            .bind(book_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    /// Reconciliation figure for a sale; compare with its stored total.
    pub async fn sum_subtotals_for_sale(&self, sale_id: SaleId) -> DbResult<Money> {
        let mut conn = self.pool.acquire().await?;
        Ok(Money::from_cents(
            sum_subtotals_for_sale(&mut conn, sale_id).await?,
        ))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::sale;
    use chrono::{NaiveDate, Utc};
    use folio_core::{BookFormat, DigitalDetails, NewAuthor, NewBook, NewClient, PaymentMethod};

    /// Database with one digital book (price 7.00) and one Pending sale.
    async fn setup() -> (Database, BookId, SaleId) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let author = db
            .authors()
            .insert(&NewAuthor {
                name: "Italo Calvino".to_string(),
                birth_date: NaiveDate::from_ymd_opt(1923, 10, 15).unwrap(),
                nationality: None,
                biography: None,
            })
            .await
            .unwrap();
        let book = db
            .books()
            .insert(&NewBook {
                title: "Invisible Cities".to_string(),
                isbn: None,
                publisher: "Einaudi".to_string(),
                publication_year: 1972,
                price_cents: 700,
                genre: None,
                format: BookFormat::Digital(DigitalDetails {
                    file_extension: "epub".to_string(),
                    printable: false,
                }),
                author_id: author.id,
            })
            .await
            .unwrap();
        let client = db
            .clients()
            .insert(&NewClient {
                name: "Ana Torres".to_string(),
                document_number: "45879632".to_string(),
                email: None,
                phone: None,
            })
            .await
            .unwrap();
        let sale = db.sales().insert_pending(client.id).await.unwrap();

        (db, book.id, sale.id)
    }

    #[tokio::test]
    async fn test_delete_line_updates_ledger() {
        let (db, book_id, sale_id) = setup().await;
        let (first, second) = {
            let mut conn = db.pool().acquire().await.unwrap();
            let first = insert(&mut conn, sale_id, book_id, 2, Money::from_cents(700))
                .await
                .unwrap();
            let second = insert(&mut conn, sale_id, book_id, 1, Money::from_cents(700))
                .await
                .unwrap();
            (first, second)
        };
        let repo = db.line_items();
        assert_eq!(repo.sum_subtotals_for_sale(sale_id).await.unwrap().cents(), 2100);

        repo.delete_by_id(first.id()).await.unwrap();

        let remaining = repo.list_by_sale(sale_id).await.unwrap();
        assert_eq!(remaining, vec![second]);
        assert_eq!(repo.sum_subtotals_for_sale(sale_id).await.unwrap().cents(), 700);

        assert!(matches!(
            repo.delete_by_id(first.id()).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_line_of_completed_sale_is_refused() {
        let (db, book_id, sale_id) = setup().await;
        let line = {
            let mut conn = db.pool().acquire().await.unwrap();
            let line = insert(&mut conn, sale_id, book_id, 3, Money::from_cents(700))
                .await
                .unwrap();
            sale::mark_completed(
                &mut conn,
                sale_id,
                line.subtotal(),
                PaymentMethod::Cash,
                Utc::now(),
            )
            .await
            .unwrap();
            line
        };

        let err = db.line_items().delete_by_id(line.id()).await.unwrap_err();
        assert!(matches!(err, DbError::InvalidSaleStatus { .. }));

        let ledger = db.line_items().sum_subtotals_for_sale(sale_id).await.unwrap();
        let stored = db.sales().get_by_id(sale_id).await.unwrap().unwrap();
        assert_eq!(ledger, stored.total());
    }

    #[tokio::test]
    async fn test_empty_sale_sums_to_zero() {
        let (db, _, sale_id) = setup().await;
        assert!(db.line_items().sum_subtotals_for_sale(sale_id).await.unwrap().is_zero());
        assert!(db.line_items().list_by_sale(sale_id).await.unwrap().is_empty());
    }
}
